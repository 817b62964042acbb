//! End-to-end library scenarios across codecs and transformations

use adifmtlib::codec::{read_bytes, write_string, CodecOptions, Format, TsvOptions};
use adifmtlib::geo::{parse_location, to_maidenhead, Axis};
use adifmtlib::transform::{infer, Condition, EditOptions, Editor, Filter, TimeShift};
use adifmtlib::{Field, Logfile, Record};

fn adi(text: &str) -> Logfile {
    read_bytes(Format::Adi, &CodecOptions::default(), text.as_bytes()).unwrap()
}

fn record(fields: &[(&str, &str)]) -> Record {
    Record::from_fields(fields.iter().map(|(n, v)| Field::new(n, *v))).unwrap()
}

#[test]
fn test_adi_to_csv() {
    let log = adi("<CALL:4>W1AW <QSO_DATE:8>19870605 <BAND:3>40M <EOR>");
    let r = &log.records[0];
    assert_eq!(r.value("CALL"), "W1AW");
    assert_eq!(r.value("QSO_DATE"), "19870605");
    assert_eq!(r.value("BAND"), "40M");
    let csv = write_string(Format::Csv, &CodecOptions::default(), &log).unwrap();
    assert_eq!(csv, "CALL,QSO_DATE,BAND\nW1AW,19870605,40M\n");
}

#[test]
fn test_maidenhead_at_origin() {
    let lat = parse_location("N000 00.000", Some(Axis::Latitude)).unwrap();
    let lon = parse_location("E000 00.000", Some(Axis::Longitude)).unwrap();
    assert_eq!(to_maidenhead(lat, lon).0, "JJ00aa00");
    let lat = parse_location("S000 00.001", Some(Axis::Latitude)).unwrap();
    let lon = parse_location("W000 00.001", Some(Axis::Longitude)).unwrap();
    assert_eq!(to_maidenhead(lat, lon), ("II99xx99".to_string(), "xx99".to_string()));
}

#[test]
fn test_band_inference() {
    let mut log = Logfile::new();
    for freq in ["146.52", "0.1378", "300000"] {
        log.records.push(record(&[("FREQ", freq)]));
    }
    infer(&mut log, &["BAND".to_string()]).unwrap();
    let bands: Vec<&str> = log.records.iter().map(|r| r.value("BAND")).collect();
    assert_eq!(bands, vec!["2m", "2190m", "submm"]);
}

#[test]
fn test_edit_time_zone() {
    let mut log = Logfile::new();
    log.records.push(record(&[("QSO_DATE", "20201231"), ("TIME_ON", "231545")]));
    let shift = TimeShift::new("America/New_York", "UTC").unwrap();
    Editor::new(EditOptions::new().with_time_shift(shift))
        .unwrap()
        .edit(&mut log)
        .unwrap();
    assert_eq!(log.records[0].value("QSO_DATE"), "20210101");
    assert_eq!(log.records[0].value("TIME_ON"), "041545");
}

#[test]
fn test_cabrillo_qso_line() {
    let text = "START-OF-LOG: 3.0\nQSO: 14234 PH 2023-10-31 1234 W1AW 57 CT AA1A 48 PAC 0\nEND-OF-LOG:\n";
    let log = read_bytes(Format::Cabrillo, &CodecOptions::default(), text.as_bytes()).unwrap();
    let expected = record(&[
        ("FREQ", "14.234"),
        ("BAND", "20m"),
        ("MODE", "SSB"),
        ("QSO_DATE", "20231031"),
        ("TIME_ON", "1234"),
        ("STATION_CALLSIGN", "W1AW"),
        ("RST_SENT", "57"),
        ("MY_ARRL_SECT", "CT"),
        ("CALL", "AA1A"),
        ("RST_RCVD", "48"),
        ("ARRL_SECT", "PAC"),
        ("APP_CABRILLO_TRANSMITTER_ID", "0"),
    ]);
    assert!(log.records[0].equal(&expected), "{:?}", log.records[0]);
}

#[test]
fn test_find_field_reference() {
    let mut log = Logfile::new();
    log.records = vec![
        record(&[("CALL", "A"), ("TIME_ON", "1200"), ("TIME_OFF", "1200")]),
        record(&[("CALL", "B"), ("TIME_ON", "1200"), ("TIME_OFF", "1215")]),
        record(&[("CALL", "C"), ("TIME_ON", "1200")]),
        record(&[("CALL", "D")]),
    ];
    let condition: Condition = "TIME_OFF={TIME_ON}".parse().unwrap();
    Filter::new().and(condition).apply(&mut log);
    let calls: Vec<&str> = log.records.iter().map(|r| r.value("CALL")).collect();
    assert_eq!(calls, vec!["A"]);
}

#[test]
fn test_adi_header_without_records() {
    let log = adi("generated <ADIF_VER:5>3.1.4 <EOH>");
    assert!(log.records.is_empty());
    assert_eq!(log.header.value("ADIF_VER"), "3.1.4");
}

#[test]
fn test_adi_multibyte_value() {
    let log = adi("<NAME:5>José <QTH:8>Zürich <EOR>");
    assert_eq!(log.records[0].value("NAME"), "José");
    assert_eq!(log.records[0].value("QTH"), "Zürich");
}

#[test]
fn test_tsv_without_escapes_rejects_tabs() {
    let mut log = Logfile::new();
    log.records.push(record(&[("NOTES", "one\ttwo")]));
    let mut options = CodecOptions::default();
    assert!(write_string(Format::Tsv, &options, &log).is_err());
    options.tsv = TsvOptions::default().with_escape_special(true);
    let out = write_string(Format::Tsv, &options, &log).unwrap();
    assert_eq!(out, "NOTES\none\\ttwo\n");
}

#[test]
fn test_cabrillo_band_boundaries() {
    use adifmtlib::codec::cabrillo::band_for_freq;
    assert_eq!(band_for_freq(146.520).map(|b| b.band), Some("2m"));
    assert_eq!(band_for_freq(14.025).map(|b| b.name), Some("14000"));
}

#[test]
fn test_adi_round_trip_is_byte_identical() {
    let text = "<CALL:4>W1AW <QSO_DATE:8>19870605 <BAND:3>40M <EOR>\n<CALL:5>K1ABC <FREQ:6:N>14.250 <EOR>\n";
    let log = adi(text);
    assert_eq!(write_string(Format::Adi, &CodecOptions::default(), &log).unwrap(), text);
}

#[test]
fn test_csv_round_trip() {
    let text = "CALL,QSO_DATE,BAND\nW1AW,19870605,40M\nK1ABC,19870606,20M\n";
    let log = read_bytes(Format::Csv, &CodecOptions::default(), text.as_bytes()).unwrap();
    assert_eq!(write_string(Format::Csv, &CodecOptions::default(), &log).unwrap(), text);
}

#[test]
fn test_adx_round_trip_preserves_records() {
    let log = adi("<ADIF_VER:5>3.1.4 <EOH>\n<CALL:4>W1AW <NOTES:4>a\r\nb <APP_TEST_X:1>y <EOR>\n");
    let xml = write_string(Format::Adx, &CodecOptions::default(), &log).unwrap();
    let again = read_bytes(Format::Adx, &CodecOptions::default(), xml.as_bytes()).unwrap();
    assert_eq!(again.header.value("ADIF_VER"), "3.1.4");
    assert!(again.records[0].equal(&log.records[0]));
}

#[test]
fn test_every_format_reads_its_own_output() {
    let log = adi("<CALL:4>W1AW <QSO_DATE:8>19870605 <TIME_ON:4>1234 <FREQ:6>14.250 <MODE:2>CW <EOR>");
    let options = CodecOptions::default();
    for format in [Format::Adi, Format::Adx, Format::Csv, Format::Json, Format::Tsv] {
        let text = write_string(format, &options, &log).unwrap();
        let again = read_bytes(format, &options, text.as_bytes()).unwrap();
        assert!(again.records[0].equal(&log.records[0]), "{format}: {text}");
    }
}
