//! Guess an encoding from a file name or from the first bytes of a stream.

use std::io::{BufReader, Chain, Cursor, Read};
use std::path::Path;

use tracing::debug;

use super::Format;
use crate::error::AdifError;
use crate::Result;

/// Bytes examined by [`guess_by_content`].
pub const PEEK_LEN: usize = 4096;

/// Format for a file name's extension.
pub fn guess_by_name(name: impl AsRef<Path>) -> Result<Format> {
    let path = name.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| AdifError::UnknownFormat(format!("{} has no extension", path.display())))?;
    let format = match ext.as_str() {
        "adi" => Format::Adi,
        "adx" => Format::Adx,
        "cbr" | "log" => Format::Cabrillo,
        "csv" => Format::Csv,
        "json" => Format::Json,
        "tsv" => Format::Tsv,
        _ => {
            return Err(AdifError::UnknownFormat(format!(
                "unrecognized extension {ext:?} on {}",
                path.display()
            )))
        }
    };
    debug!(path = %path.display(), %format, "format from file name");
    Ok(format)
}

/// A stream with its peeked prefix put back.
pub type Rewound<R> = BufReader<Chain<Cursor<Vec<u8>>, R>>;

/// Examine the start of `input` and return the detected format together
/// with a reader that still yields every byte.
pub fn guess_by_content<R: Read>(mut input: R) -> Result<(Format, Rewound<R>)> {
    let mut head = Vec::with_capacity(PEEK_LEN);
    (&mut input).take(PEEK_LEN as u64).read_to_end(&mut head)?;
    let format = guess_bytes(&head);
    let rewound = BufReader::new(Cursor::new(head).chain(input));
    let format = format?;
    debug!(%format, "format from content");
    Ok((format, rewound))
}

/// Detect a format from a prefix of the input.
pub fn guess_bytes(head: &[u8]) -> Result<Format> {
    let start = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(head.len());
    let text = &head[start..];
    if starts_with_ignore_case(text, b"<?xml") || starts_with_ignore_case(text, b"<ADX>") {
        return Ok(Format::Adx);
    }
    if starts_with_ignore_case(text, b"START-OF-LOG:") {
        return Ok(Format::Cabrillo);
    }
    if looks_like_adi(head) {
        return Ok(Format::Adi);
    }
    if text.first() == Some(&b'{') {
        return Ok(Format::Json);
    }
    if is_header_line(text, b',') {
        return Ok(Format::Csv);
    }
    if is_header_line(text, b'\t') {
        return Ok(Format::Tsv);
    }
    Err(AdifError::UnknownFormat(
        "could not determine the input format from its content".to_string(),
    ))
}

fn starts_with_ignore_case(text: &[u8], prefix: &[u8]) -> bool {
    text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Text, then a tag shaped like `<NAME:DIGITS>` or `<NAME:DIGITS:T>`.
fn looks_like_adi(head: &[u8]) -> bool {
    let Some(open) = head.iter().position(|&b| b == b'<') else {
        return false;
    };
    let Some(close) = head[open..].iter().position(|&b| b == b'>') else {
        return false;
    };
    let tag = &head[open + 1..open + close];
    let mut parts = tag.split(|&b| b == b':');
    let name_ok = parts
        .next()
        .is_some_and(|n| !n.is_empty() && n.iter().all(|&b| is_name_byte(b)));
    let len_ok = parts
        .next()
        .is_some_and(|l| !l.is_empty() && l.iter().all(u8::is_ascii_digit));
    let type_ok = match parts.next() {
        None => true,
        Some(t) => t.len() == 1 && t[0].is_ascii_alphabetic(),
    };
    name_ok && len_ok && type_ok && parts.next().is_none()
}

/// `NAME(<sep>NAME)+` terminated by a newline.
fn is_header_line(text: &[u8], sep: u8) -> bool {
    let Some(end) = text.iter().position(|&b| b == b'\n') else {
        return false;
    };
    let line = text[..end].strip_suffix(b"\r").unwrap_or(&text[..end]);
    let names: Vec<&[u8]> = line.split(|&b| b == sep).collect();
    names.len() > 1
        && names
            .iter()
            .all(|n| !n.is_empty() && n.iter().all(|&b| is_name_byte(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_by_name() {
        assert_eq!(guess_by_name("log.ADI").unwrap(), Format::Adi);
        assert_eq!(guess_by_name("dir/contest.cbr").unwrap(), Format::Cabrillo);
        assert_eq!(guess_by_name("x.log").unwrap(), Format::Cabrillo);
        assert_eq!(guess_by_name("x.json").unwrap(), Format::Json);
        assert!(guess_by_name("noext").is_err());
        assert!(guess_by_name("x.txt").is_err());
    }

    #[test]
    fn test_guess_bytes() {
        let cases: &[(&str, Format)] = &[
            ("  <?xml version=\"1.0\"?><ADX>", Format::Adx),
            ("<adx><HEADER>", Format::Adx),
            ("START-OF-LOG: 3.0\n", Format::Cabrillo),
            ("Exported log\n<ADIF_VER:5>3.1.4<EOH>", Format::Adi),
            ("<call:4:s>W1AW<eor>", Format::Adi),
            ("\n{\"RECORDS\": []}", Format::Json),
            ("CALL,QSO_DATE,BAND\r\nW1AW,19870605,40M\n", Format::Csv),
            ("CALL\tBAND\nW1AW\t40M\n", Format::Tsv),
        ];
        for (input, expected) in cases {
            assert_eq!(guess_bytes(input.as_bytes()).unwrap(), *expected, "{input}");
        }
        assert!(guess_bytes(b"hello world").is_err());
        assert!(guess_bytes(b"CALL\n").is_err());
        assert!(guess_bytes(b"<b>bold</b>").is_err());
    }

    #[test]
    fn test_content_is_rewound() {
        let input = "CALL,BAND\nW1AW,40M\n";
        let (format, mut reader) = guess_by_content(input.as_bytes()).unwrap();
        assert_eq!(format, Format::Csv);
        let mut all = String::new();
        reader.read_to_string(&mut all).unwrap();
        assert_eq!(all, input);
    }

    #[test]
    fn test_long_input_is_rewound() {
        let mut input = String::from("<ADIF_VER:5>3.1.4<EOH>\n");
        while input.len() < PEEK_LEN * 2 {
            input.push_str("<CALL:4>W1AW<EOR>\n");
        }
        let (format, mut reader) = guess_by_content(input.as_bytes()).unwrap();
        assert_eq!(format, Format::Adi);
        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, input.as_bytes());
    }
}
