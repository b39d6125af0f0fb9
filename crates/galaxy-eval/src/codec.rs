//! Modulation: the self-delimiting bit encoding of integers and cons cells.
//!
//! ```text
//! nil        00
//! pair       11 <car> <cdr>
//! integer    <sign> <1 per nibble> 0 <magnitude, 4 bits per nibble>
//! sign       01 (zero or positive) | 10 (negative)
//! ```
//!
//! Zero encodes as `010`. Both directions keep their work on an explicit
//! stack, so a long list costs heap, not call stack.

use galaxy_types::{Term, TermRef};
use thiserror::Error;

use crate::error::{describe, excerpt};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Only integers, `nil` and pairs of those can be modulated.
    #[error("cannot modulate {term}")]
    Unmodulatable { term: String },

    /// `bits` is the whole offending signal; only the message shortens it.
    #[error("malformed signal ({reason}): {}", excerpt(.bits))]
    MalformedSignal { reason: &'static str, bits: String },
}

/// Encode a fully evaluated term.
pub fn modulate(term: &Term) -> Result<String, CodecError> {
    let mut out = String::new();
    let mut pending: Vec<&Term> = vec![term];

    while let Some(term) = pending.pop() {
        match term {
            Term::Nil => out.push_str("00"),
            Term::Pair(car, cdr) => {
                out.push_str("11");
                pending.push(cdr);
                pending.push(car);
            }
            Term::Int(n) => modulate_int(*n, &mut out),
            other => {
                return Err(CodecError::Unmodulatable {
                    term: describe(other),
                })
            }
        }
    }
    Ok(out)
}

fn modulate_int(n: i64, out: &mut String) {
    out.push_str(if n < 0 { "10" } else { "01" });
    let magnitude = n.unsigned_abs();
    let bits = u64::BITS - magnitude.leading_zeros();
    let nibbles = bits.div_ceil(4) as usize;
    out.extend(std::iter::repeat_n('1', nibbles));
    out.push('0');
    if nibbles > 0 {
        out.push_str(&format!("{magnitude:0width$b}", width = nibbles * 4));
    }
}

/// A pair whose car is still being read, or whose car is known.
enum Frame {
    Car,
    Cdr(TermRef),
}

/// Decode a signal produced by [`modulate`].
///
/// Non-canonical integers (extra leading zero nibbles, negative zero) are
/// accepted. Trailing bits, truncation, characters other than `0`/`1` and
/// magnitudes outside `i64` are rejected.
pub fn demodulate(bits: &str) -> Result<TermRef, CodecError> {
    let malformed = |reason| CodecError::MalformedSignal {
        reason,
        bits: bits.to_string(),
    };
    if bits.bytes().any(|b| !matches!(b, b'0' | b'1')) {
        return Err(malformed("not a bit string"));
    }

    let mut reader = BitReader {
        bits: bits.as_bytes(),
        pos: 0,
    };
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let prefix = reader.take(2).ok_or_else(|| malformed("truncated"))?;
        let mut value = match prefix {
            0b00 => Term::nil(),
            0b11 => {
                stack.push(Frame::Car);
                continue;
            }
            sign => {
                let negative = sign == 0b10;
                let n = reader.read_int(negative).map_err(|reason| malformed(reason))?;
                Term::int(n)
            }
        };

        // Close every pair this value completes.
        loop {
            match stack.pop() {
                Some(Frame::Car) => {
                    stack.push(Frame::Cdr(value));
                    break;
                }
                Some(Frame::Cdr(car)) => value = Term::pair(car, value),
                None => {
                    return if reader.at_end() {
                        Ok(value)
                    } else {
                        Err(malformed("trailing bits"))
                    };
                }
            }
        }
    }
}

struct BitReader<'a> {
    bits: &'a [u8],
    pos: usize,
}

impl BitReader<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bits.len()
    }

    fn take(&mut self, count: usize) -> Option<u64> {
        let end = self.pos.checked_add(count)?;
        let chunk = self.bits.get(self.pos..end)?;
        self.pos = end;
        Some(chunk.iter().fold(0, |acc, b| (acc << 1) | u64::from(b - b'0')))
    }

    /// Read the nibble count and magnitude that follow a sign prefix.
    fn read_int(&mut self, negative: bool) -> Result<i64, &'static str> {
        let mut nibbles = 0usize;
        loop {
            match self.take(1) {
                Some(1) => nibbles += 1,
                Some(_) => break,
                None => return Err("truncated"),
            }
        }

        let mut magnitude: u64 = 0;
        for _ in 0..nibbles {
            let nibble = self.take(4).ok_or("truncated")?;
            if magnitude >> 60 != 0 {
                return Err("integer out of range");
            }
            magnitude = (magnitude << 4) | nibble;
        }

        if negative {
            0i64.checked_sub_unsigned(magnitude)
                .ok_or("integer out of range")
        } else {
            i64::try_from(magnitude).map_err(|_| "integer out of range")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(term: TermRef) -> String {
        modulate(&term).unwrap()
    }

    #[test]
    fn test_integer_vectors() {
        assert_eq!(m(Term::int(0)), "010");
        assert_eq!(m(Term::int(1)), "01100001");
        assert_eq!(m(Term::int(-1)), "10100001");
        assert_eq!(m(Term::int(15)), "01101111");
        assert_eq!(m(Term::int(16)), "0111000010000");
        assert_eq!(m(Term::int(42)), "0111000101010");
        assert_eq!(m(Term::int(-256)), "1011100100000000");
    }

    #[test]
    fn test_extreme_integers() {
        for n in [i64::MAX, i64::MIN, i64::MIN + 1] {
            assert_eq!(demodulate(&m(Term::int(n))).unwrap(), Term::int(n));
        }
        assert_eq!(m(Term::int(i64::MIN)).len(), 2 + 17 + 64);
    }

    #[test]
    fn test_cons_vectors() {
        assert_eq!(m(Term::nil()), "00");
        assert_eq!(m(Term::pair(Term::nil(), Term::nil())), "110000");
        assert_eq!(m(Term::point(1, 2)), "110110000101100010");
        assert_eq!(
            m(Term::list([Term::int(1), Term::int(2)])),
            "1101100001110110001000"
        );
    }

    #[test]
    fn test_unmodulatable() {
        let err = modulate(&Term::Signal("0".into())).unwrap_err();
        assert!(matches!(err, CodecError::Unmodulatable { .. }));
        let inner = Term::pair(Term::int(1), Term::var(galaxy_types::VarId(3)));
        assert!(modulate(&inner).is_err());
    }

    #[test]
    fn test_non_canonical_accepted() {
        // 1 with a leading zero nibble
        assert_eq!(demodulate("011100000001").unwrap(), Term::int(1));
        // negative zero
        assert_eq!(demodulate("100").unwrap(), Term::int(0));
    }

    #[test]
    fn test_malformed() {
        let reason = |bits: &str| match demodulate(bits) {
            Err(CodecError::MalformedSignal { reason, .. }) => reason,
            other => panic!("expected malformed signal for {bits}, got {other:?}"),
        };
        assert_eq!(reason(""), "truncated");
        assert_eq!(reason("0"), "truncated");
        assert_eq!(reason("0110000"), "truncated");
        assert_eq!(reason("11"), "truncated");
        assert_eq!(reason("1100"), "truncated");
        assert_eq!(reason("0100"), "trailing bits");
        assert_eq!(reason("01a"), "not a bit string");
        let too_big = format!("01{}0{}", "1".repeat(17), "0001".repeat(17));
        assert_eq!(reason(&too_big), "integer out of range");
        // 2^63 as a positive magnitude
        let just_over = format!("01{}01000{}", "1".repeat(16), "0000".repeat(15));
        assert_eq!(reason(&just_over), "integer out of range");
    }

    #[test]
    fn test_malformed_keeps_whole_signal() {
        let bits = format!("{}1", "110000".repeat(40));
        let err = demodulate(&bits).unwrap_err();
        assert_eq!(
            err,
            CodecError::MalformedSignal {
                reason: "trailing bits",
                bits: bits.clone(),
            }
        );
        let message = err.to_string();
        assert!(message.ends_with("..."), "{message}");
        assert!(message.len() < bits.len());
    }
}
