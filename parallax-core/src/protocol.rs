/// Line protocol for head samples sent by an external face tracker
///
/// ```text
/// landmark <u> <v>    normalized image position in [0, 1]
/// offset <x> <y>      head offset in [-1, 1]
/// ```
///
/// Blank lines and `#` comments carry no sample.
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{multispace0, space1},
    combinator::{all_consuming, map, value},
    number::complete::float,
    sequence::{delimited, separated_pair},
    IResult,
};
use thiserror::Error;

use crate::head::HeadOffset;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// Face landmark in image coordinates, 0..1 on both axes
    Landmark { u: f32, v: f32 },
    /// Already-normalized offset
    Offset { x: f32, y: f32 },
}

impl Sample {
    /// Head offset for this sample; `mirror` flips x for selfie cameras
    pub fn to_offset(self, mirror: bool) -> HeadOffset {
        let offset = match self {
            Sample::Landmark { u, v } => HeadOffset::from_landmark(u, v),
            Sample::Offset { x, y } => HeadOffset::new(x, y),
        };
        if mirror {
            offset.mirrored()
        } else {
            offset
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed head sample: {line:?}")]
pub struct ParseError {
    pub line: String,
}

#[derive(Clone, Copy)]
enum Kind {
    Landmark,
    Offset,
}

fn pair(input: &str) -> IResult<&str, (f32, f32)> {
    separated_pair(float, space1, float)(input)
}

fn sample(input: &str) -> IResult<&str, Sample> {
    let kind = alt((
        value(Kind::Landmark, tag("landmark")),
        value(Kind::Offset, tag("offset")),
    ));
    map(
        delimited(multispace0, separated_pair(kind, space1, pair), multispace0),
        |(kind, (a, b))| match kind {
            Kind::Landmark => Sample::Landmark { u: a, v: b },
            Kind::Offset => Sample::Offset { x: a, y: b },
        },
    )(input)
}

/// Parse one line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<Sample>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    match all_consuming(sample)(trimmed) {
        Ok((_, s)) if s.is_finite() => Ok(Some(s)),
        _ => Err(ParseError {
            line: trimmed.to_string(),
        }),
    }
}

/// Newest valid sample in a multi-line payload such as a UDP datagram
pub fn last_sample(payload: &str) -> Option<Sample> {
    payload
        .lines()
        .filter_map(|line| match parse_line(line) {
            Ok(sample) => sample,
            Err(err) => {
                tracing::debug!(%err, "dropping head sample");
                None
            }
        })
        .last()
}

impl Sample {
    fn is_finite(&self) -> bool {
        match *self {
            Sample::Landmark { u, v } => u.is_finite() && v.is_finite(),
            Sample::Offset { x, y } => x.is_finite() && y.is_finite(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_landmark() {
        assert_eq!(
            parse_line("landmark 0.25 0.75").unwrap(),
            Some(Sample::Landmark { u: 0.25, v: 0.75 })
        );
    }

    #[test]
    fn test_parse_offset_with_whitespace() {
        assert_eq!(
            parse_line("  offset\t-0.5   1\r\n").unwrap(),
            Some(Sample::Offset { x: -0.5, y: 1.0 })
        );
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# tracker v2").unwrap(), None);
    }

    #[test]
    fn test_malformed_lines() {
        for line in [
            "landmark 0.5",
            "offset x y",
            "head 0.1 0.2",
            "offset 0.1 0.2 0.3",
            "landmark0.1 0.2",
            "offset nan 0.1",
        ] {
            let err = parse_line(line).unwrap_err();
            assert_eq!(err.line, line.trim());
        }
    }

    #[test]
    fn test_to_offset() {
        let s = Sample::Landmark { u: 0.75, v: 0.5 };
        assert_eq!(s.to_offset(false), HeadOffset::new(0.5, 0.0));
        assert_eq!(s.to_offset(true), HeadOffset::new(-0.5, 0.0));

        // Out of range offsets clamp
        let s = Sample::Offset { x: 3.0, y: -0.2 };
        assert_eq!(s.to_offset(false), HeadOffset::new(1.0, -0.2));
    }

    #[test]
    fn test_last_sample_skips_garbage() {
        let payload = "offset 0.1 0.1\ngarbage\nlandmark 0.5 0.5\n# done\n";
        assert_eq!(last_sample(payload), Some(Sample::Landmark { u: 0.5, v: 0.5 }));
        assert_eq!(last_sample("nope\n\n"), None);
    }
}
