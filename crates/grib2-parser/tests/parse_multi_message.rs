//! Reading and indexing multi-message files.

use bytes::Bytes;
use grib2_parser::{Grib2Error, Grib2Index, Grib2Reader, Grib2Tables, RecordKey, UNKNOWN};
use test_utils::{assert_approx_eq, assert_slice_approx_eq, build_grib2_file, Grib2Builder};

fn forecast_file() -> Vec<u8> {
    build_grib2_file(&[
        // 1: 2 m temperature
        Grib2Builder::new_hrrr().with_gradient(270.0, 300.0),
        // 2: 500 hPa temperature
        Grib2Builder::new_hrrr()
            .with_level(100, 50_000)
            .with_constant_value(255.0),
        // 3: CAPE over the whole atmosphere
        Grib2Builder::new_hrrr()
            .with_parameter(7, 6)
            .with_level(1, 0)
            .with_second_surface(8, 0)
            .with_constant_value(1500.0),
        // 4: NCEP local hourly max reflectivity
        Grib2Builder::new_hrrr()
            .with_parameter(16, 198)
            .with_level(103, 1000)
            .with_gradient(0.0, 60.0),
        // 5: NCEP local updraft helicity layer
        Grib2Builder::new_hrrr()
            .with_parameter(7, 199)
            .with_level(103, 5000)
            .with_second_surface(103, 2000)
            .with_constant_value(25.0),
    ])
}

#[test]
fn test_reader_yields_every_message() {
    let mut reader = Grib2Reader::new(Bytes::from(forecast_file()));
    let messages = reader.read_all().expect("read messages");

    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].grid_dims(), (6, 8));
    assert_eq!(messages[3].product_definition.parameter_number, 198);
}

#[test]
fn test_reader_skips_padding_between_messages() {
    let mut data = Grib2Builder::new_hrrr().build();
    data.extend_from_slice(&[0u8; 7]);
    data.extend(Grib2Builder::new_hrrr().with_parameter(7, 6).build());

    let messages = Grib2Reader::new(Bytes::from(data)).read_all().unwrap();
    assert_eq!(messages.len(), 2);
}

#[test]
fn test_unpack_gradient() {
    let index = Grib2Index::from_bytes(Bytes::from(forecast_file()), &Grib2Tables::shared()).unwrap();
    let values = index.values(index.record(1).unwrap()).unwrap();

    assert_eq!(values.len(), 48);
    assert_approx_eq!(values[0], 270.0, 0.01);
    assert_approx_eq!(values[47], 270.0 + 30.0 * 47.0 / 48.0, 0.01);
}

#[test]
fn test_unpack_with_bitmap() {
    let mut data: Vec<f32> = (0..48).map(|i| i as f32).collect();
    data[5] = f32::NAN;
    data[40] = f32::NAN;
    let file = Grib2Builder::new_hrrr().with_data(data.clone()).build();

    let index = Grib2Index::from_bytes(Bytes::from(file), &Grib2Tables::shared()).unwrap();
    let values = index.values(index.record(1).unwrap()).unwrap();

    assert_slice_approx_eq!(values, data, 0.01);
}

#[test]
fn test_record_metadata() {
    let index = Grib2Index::from_bytes(Bytes::from(forecast_file()), &Grib2Tables::shared()).unwrap();
    assert_eq!(index.len(), 5);

    let tmp2m = index.record(1).unwrap();
    assert_eq!(tmp2m.short_name, "TMP");
    assert_eq!(tmp2m.units, "K");
    assert_eq!(tmp2m.type_of_level, "heightAboveGround");
    assert_eq!(tmp2m.level, 2);

    let tmp500 = index.record(2).unwrap();
    assert_eq!(tmp500.type_of_level, "isobaricInhPa");
    assert_eq!(tmp500.level_label, "500");

    let maxref = index.record(4).unwrap();
    assert_eq!(maxref.short_name, UNKNOWN);
    assert_eq!(maxref.units, UNKNOWN);
    assert_eq!(maxref.parameter_number, 198);

    let uphl = index.record(5).unwrap();
    assert_eq!(uphl.type_of_level, "heightAboveGroundLayer");
    assert_eq!(uphl.level, 5000);
    assert_eq!(uphl.level_label, "5000-2000");
}

#[test]
fn test_select_by_keys() {
    let index = Grib2Index::from_bytes(Bytes::from(forecast_file()), &Grib2Tables::shared()).unwrap();

    let tmp = index.select(&[RecordKey::ShortName("TMP".into())]).unwrap();
    assert_eq!(tmp.len(), 2);

    let tmp500 = index
        .select(&[
            RecordKey::Name("Temperature".into()),
            RecordKey::TypeOfLevel("isobaricInhPa".into()),
        ])
        .unwrap();
    assert_eq!(tmp500.len(), 1);
    assert_eq!(tmp500[0].number, 2);

    let uphl = index
        .select(&[RecordKey::ParameterNumber(199), RecordKey::Level(5000)])
        .unwrap();
    assert_eq!(uphl[0].number, 5);
}

#[test]
fn test_select_without_match() {
    let index = Grib2Index::from_bytes(Bytes::from(forecast_file()), &Grib2Tables::shared()).unwrap();

    let err = index
        .select(&[RecordKey::ShortName("REFC".into())])
        .unwrap_err();
    assert!(matches!(err, Grib2Error::NoMatch(_)));
    assert!(matches!(index.record(0), Err(Grib2Error::NoMatch(_))));
    assert!(matches!(index.record(6), Err(Grib2Error::NoMatch(_))));
}

#[test]
fn test_open_from_disk() {
    let dir = test_utils::scratch_dir();
    let path = dir.path().join("hrrr.grib2");
    std::fs::write(&path, forecast_file()).unwrap();

    let index = Grib2Index::open(&path).unwrap();
    assert_eq!(index.len(), 5);
    assert!(matches!(
        Grib2Index::open(dir.path().join("missing.grib2")),
        Err(Grib2Error::Io(_))
    ));
}
