//! Zeek conn.log reader: tab-separated ASCII logs (with `#fields` or a plain header line)
//! and JSON-lines logs. Malformed lines are reported per line and never reach the engine.

use super::{ConnState, ConnectionRecord};
use crate::error::RecordError;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::io::{BufRead, ErrorKind};

const FIELD_TS: &str = "ts";
const FIELD_UID: &str = "uid";
const FIELD_ORIG_H: &str = "id.orig_h";
const FIELD_ORIG_P: &str = "id.orig_p";
const FIELD_RESP_H: &str = "id.resp_h";
const FIELD_RESP_P: &str = "id.resp_p";
const FIELD_PROTO: &str = "proto";
const FIELD_DURATION: &str = "duration";
const FIELD_ORIG_BYTES: &str = "orig_bytes";
const FIELD_RESP_BYTES: &str = "resp_bytes";
const FIELD_CONN_STATE: &str = "conn_state";

/// Iterator of records over any buffered reader. Lines are decoded one at a time, so a
/// line that is not UTF-8 is rejected on its own; only a failing read ends iteration.
pub struct ZeekConnReader<R> {
    reader: R,
    buf: Vec<u8>,
    header: Option<Vec<String>>,
    line_no: usize,
    failed: bool,
}

impl<R: BufRead> ZeekConnReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            header: None,
            line_no: 0,
            failed: false,
        }
    }

    /// Column names currently in effect, if a header has been seen.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }
}

impl<R: BufRead> Iterator for ZeekConnReader<R> {
    type Item = Result<ConnectionRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(RecordError::Io(e)));
                }
            }
            self.line_no += 1;
            let Ok(text) = std::str::from_utf8(&self.buf) else {
                return Some(Err(RecordError::InvalidEncoding { line: self.line_no }));
            };
            let line = text.trim_end_matches(|c| c == '\n' || c == '\r');
            if line.trim().is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("#fields") {
                self.header = Some(
                    rest.split('\t')
                        .filter(|f| !f.is_empty())
                        .map(String::from)
                        .collect(),
                );
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            if line.trim_start().starts_with('{') {
                return Some(parse_json_line(line, self.line_no));
            }
            if self.header.is_none() && line.contains(FIELD_ORIG_H) && line.contains(FIELD_RESP_H) {
                self.header = Some(line.split('\t').map(|f| f.trim().to_string()).collect());
                continue;
            }
            let Some(header) = self.header.as_deref() else {
                return Some(Err(RecordError::NoHeader { line: self.line_no }));
            };
            return Some(parse_tsv_line(header, line, self.line_no));
        }
    }
}

fn is_unset(value: &str) -> bool {
    matches!(value, "" | "-" | "(empty)")
}

fn parse_tsv_line(header: &[String], line: &str, line_no: usize) -> Result<ConnectionRecord, RecordError> {
    let values: Vec<&str> = line.split('\t').map(str::trim).collect();
    build_record(line_no, |name| {
        let idx = header.iter().position(|h| h == name)?;
        let value = *values.get(idx)?;
        (!is_unset(value)).then_some(Cow::Borrowed(value))
    })
}

fn parse_json_line(line: &str, line_no: usize) -> Result<ConnectionRecord, RecordError> {
    let map: Map<String, Value> =
        serde_json::from_str(line).map_err(|source| RecordError::Json { line: line_no, source })?;
    build_record(line_no, |name| match map.get(name)? {
        Value::String(s) if !is_unset(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        _ => None,
    })
}

fn build_record<'a>(
    line: usize,
    get: impl Fn(&'static str) -> Option<Cow<'a, str>>,
) -> Result<ConnectionRecord, RecordError> {
    let required = |field: &'static str| get(field).ok_or(RecordError::MissingField { line, field });

    let ts = parse_seconds(line, FIELD_TS, &required(FIELD_TS)?)?;
    let orig_host = required(FIELD_ORIG_H)?.into_owned();
    let orig_port = parse_count(line, FIELD_ORIG_P, &required(FIELD_ORIG_P)?)?;
    let resp_host = required(FIELD_RESP_H)?.into_owned();
    let resp_port = parse_count(line, FIELD_RESP_P, &required(FIELD_RESP_P)?)?;
    let proto = required(FIELD_PROTO)?.into_owned();

    let orig_port = u16::try_from(orig_port).map_err(|_| RecordError::InvalidField {
        line,
        field: FIELD_ORIG_P,
        value: orig_port.to_string(),
    })?;
    let resp_port = u16::try_from(resp_port).map_err(|_| RecordError::InvalidField {
        line,
        field: FIELD_RESP_P,
        value: resp_port.to_string(),
    })?;

    let duration = get(FIELD_DURATION)
        .map(|v| parse_seconds(line, FIELD_DURATION, &v))
        .transpose()?;
    let orig_bytes = get(FIELD_ORIG_BYTES)
        .map(|v| parse_count(line, FIELD_ORIG_BYTES, &v))
        .transpose()?;
    let resp_bytes = get(FIELD_RESP_BYTES)
        .map(|v| parse_count(line, FIELD_RESP_BYTES, &v))
        .transpose()?;

    Ok(ConnectionRecord {
        ts,
        uid: get(FIELD_UID).map(Cow::into_owned).unwrap_or_default(),
        orig_host,
        orig_port,
        resp_host,
        resp_port,
        proto,
        duration,
        orig_bytes,
        resp_bytes,
        conn_state: get(FIELD_CONN_STATE).map(|v| ConnState::from_code(&v)),
    })
}

/// Non-negative, finite seconds.
fn parse_seconds(line: usize, field: &'static str, value: &str) -> Result<f64, RecordError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(RecordError::InvalidField {
            line,
            field,
            value: value.to_string(),
        }),
    }
}

/// Non-negative integer; integral floats such as `650.0` are accepted.
fn parse_count(line: usize, field: &'static str, value: &str) -> Result<u64, RecordError> {
    if let Ok(v) = value.parse::<u64>() {
        return Ok(v);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
        _ => Err(RecordError::InvalidField {
            line,
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ZEEK_TSV: &str = "#separator \\x09\n\
#path\tconn\n\
#fields\tts\tuid\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\tservice\tduration\torig_bytes\tresp_bytes\tconn_state\n\
#types\ttime\tstring\taddr\tport\taddr\tport\tenum\tstring\tinterval\tcount\tcount\tstring\n\
1700000000.000000\tCa1\t10.0.0.5\t51000\t10.0.0.9\t443\ttcp\tssl\t-\t650\t-\tS0\n\
1700000020.000000\tCa1\t10.0.0.5\t51000\t10.0.0.9\t443\ttcp\tssl\t20.123456\t1200\t8500\tSF\n\
#close\t2024-01-01-00-00-00\n";

    fn read_all(input: &str) -> Vec<Result<ConnectionRecord, RecordError>> {
        ZeekConnReader::new(Cursor::new(input.to_string())).collect()
    }

    #[test]
    fn test_parse_fields_directive() {
        let out = read_all(ZEEK_TSV);
        assert_eq!(out.len(), 2);
        let first = out[0].as_ref().unwrap();
        assert_eq!(first.uid, "Ca1");
        assert_eq!(first.orig_host, "10.0.0.5");
        assert_eq!(first.resp_port, 443);
        assert_eq!(first.duration, None);
        assert_eq!(first.orig_bytes, Some(650));
        assert_eq!(first.resp_bytes, None);
        assert_eq!(first.conn_state, Some(ConnState::SynOnly));

        let second = out[1].as_ref().unwrap();
        assert_eq!(second.duration, Some(20.123456));
        assert_eq!(second.conn_state, Some(ConnState::ClosedSuccess));
    }

    #[test]
    fn test_parse_plain_header() {
        let input = "ts\tuid\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\tconn_state\n\
5.5\tC1\ta\t1\tb\t2\tudp\tOTH\n";
        let out = read_all(input);
        assert_eq!(out.len(), 1);
        let rec = out[0].as_ref().unwrap();
        assert_eq!(rec.ts, 5.5);
        assert_eq!(rec.proto, "udp");
        assert_eq!(rec.conn_state, Some(ConnState::Midstream));
    }

    #[test]
    fn test_parse_json_line() {
        let input = r#"{"ts":1.25,"uid":"CJ","id.orig_h":"h1","id.orig_p":4000,"id.resp_h":"h2","id.resp_p":22.0,"proto":"tcp","orig_bytes":10,"conn_state":"RSTO"}"#;
        let out = read_all(input);
        let rec = out[0].as_ref().unwrap();
        assert_eq!(rec.resp_port, 22);
        assert_eq!(rec.orig_bytes, Some(10));
        assert_eq!(rec.resp_bytes, None);
        assert_eq!(rec.conn_state, Some(ConnState::ResetByOriginator));
    }

    #[test]
    fn test_missing_required_field() {
        let input = "#fields\tts\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\n\
1.0\t-\t1\tb\t2\ttcp\n\
2.0\ta\t1\tb\t2\ttcp\n";
        let out = read_all(input);
        assert_eq!(out.len(), 2);
        assert!(matches!(
            out[0],
            Err(RecordError::MissingField { line: 2, field: "id.orig_h" })
        ));
        assert!(out[1].is_ok());
    }

    #[test]
    fn test_invalid_port() {
        let input = "#fields\tts\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\n\
1.0\ta\t70000\tb\t2\ttcp\n";
        let out = read_all(input);
        assert!(matches!(
            out[0],
            Err(RecordError::InvalidField { field: "id.orig_p", .. })
        ));
    }

    #[test]
    fn test_data_before_header() {
        let out = read_all("1.0\ta\t1\tb\t2\ttcp\n");
        assert!(matches!(out[0], Err(RecordError::NoHeader { line: 1 })));
    }

    #[test]
    fn test_non_utf8_line_rejected_alone() {
        let mut input = b"#fields\tts\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\tconn_state\n\
1.0\ta\t1\tb\t2\ttcp\tS0\n"
            .to_vec();
        input.extend_from_slice(b"2.0\t\xff\xfe\t1\tb\t2\ttcp\tS0\n");
        input.extend_from_slice(b"3.0\ta\t1\tb\t2\ttcp\tSF\n");

        let out: Vec<_> = ZeekConnReader::new(Cursor::new(input)).collect();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap().orig_host, "a");
        assert!(matches!(out[1], Err(RecordError::InvalidEncoding { line: 3 })));
        assert_eq!(out[2].as_ref().unwrap().conn_state, Some(ConnState::ClosedSuccess));
    }

    #[test]
    fn test_unknown_state_kept() {
        assert_eq!(ConnState::from_code("XYZ"), ConnState::Other("XYZ".into()));
        assert_eq!(ConnState::from_code("XYZ").code(), "XYZ");
        assert!(!ConnState::from_code("XYZ").is_terminal());
    }
}
