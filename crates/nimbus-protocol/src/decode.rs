//! Frame decoder.
//!
//! Expected MSG syntax:
//!
//! ```text
//! MSG <subject> <sid> [reply-to] <#bytes>\r\n<payload>\r\n
//! ```
//!
//! Header tokenizing requires the complete CRLF-terminated line to be
//! buffered already; an unterminated or CR-less line is a
//! [`DecodeError::MalformedLine`], never a data deficit. Once the
//! header is valid, a short payload yields
//! [`Decoded::Incomplete`] with the exact byte deficit and consumes
//! nothing from the payload region; [`resume`] finishes the frame after
//! the transport appends the missing bytes. The header is consumed
//! along with the line read and is never re-presented.

use crate::cursor::ReadBuffer;
use crate::error::{DecodeError, DecodeResult};
use crate::types::{Decoded, Frame, NeedMoreData, ServerFrame};
use crate::MAX_PAYLOAD_SIZE;

const MSG: &str = "MSG";
const HMSG: &str = "HMSG";
const INFO: &str = "INFO";
const ERR: &str = "-ERR";

/// Decodes one MSG frame from the buffer.
///
/// Returns [`Decoded::Incomplete`] when the header is valid but fewer
/// than `length + 2` payload bytes are buffered. Any error means the
/// stream is desynchronized and the connection should be closed.
pub fn decode(buf: &mut ReadBuffer) -> DecodeResult<Decoded> {
    let tokens = header_tokens(buf)?;
    if tokens.len() < 3 || tokens[0] != MSG {
        return Err(DecodeError::BadSyntax);
    }

    let (reply_to, length_token) = match tokens.len() {
        3 => return Err(DecodeError::MissingLength),
        4 => (None, tokens[3].as_str()),
        _ => (Some(tokens[3].clone()), tokens[4].as_str()),
    };

    let frame = Frame {
        subject: tokens[1].clone(),
        sid: tokens[2].clone(),
        reply_to,
        length: parse_length(length_token)?,
        payload: Vec::new(),
    };
    Ok(complete(buf, frame))
}

/// Re-runs solely the payload-completion step for a partial frame
/// previously returned through [`Decoded::Incomplete`].
pub fn resume(buf: &mut ReadBuffer, partial: Frame) -> Decoded {
    complete(buf, partial)
}

/// Classifies and decodes the next server frame by its leading byte.
///
/// Control frames (INFO, PING, PONG, +OK, -ERR) consume one CRLF line;
/// MSG and HMSG go through the payload-aware path and may come back
/// incomplete.
pub fn decode_frame(buf: &mut ReadBuffer) -> DecodeResult<ServerFrame> {
    match buf.peek().ok_or(DecodeError::MalformedLine)? {
        b'M' => decode(buf).map(ServerFrame::Msg),
        b'H' => decode_hmsg(buf).map(ServerFrame::HMsg),
        b'I' => {
            let line = header_line(buf)?;
            match line.split_once(' ') {
                Some((INFO, json)) => Ok(ServerFrame::Info(json.trim().to_string())),
                _ => Err(DecodeError::BadSyntax),
            }
        }
        b'P' => {
            let line = header_line(buf)?;
            match line.as_str() {
                "PING" => Ok(ServerFrame::Ping),
                "PONG" => Ok(ServerFrame::Pong),
                _ => Err(DecodeError::BadSyntax),
            }
        }
        b'+' => {
            let line = header_line(buf)?;
            if line.starts_with("+OK") {
                Ok(ServerFrame::Ok)
            } else {
                Err(DecodeError::BadSyntax)
            }
        }
        b'-' => {
            let line = header_line(buf)?;
            if line == ERR {
                return Ok(ServerFrame::Err(String::new()));
            }
            match line.split_once(' ') {
                Some((ERR, text)) => Ok(ServerFrame::Err(text.trim().to_string())),
                _ => Err(DecodeError::BadSyntax),
            }
        }
        byte => Err(DecodeError::UnknownCommand { byte }),
    }
}

/// HMSG carries a header block before the payload:
///
/// ```text
/// HMSG <subject> <sid> [reply-to] <#header-bytes> <#total-bytes>\r\n
/// ```
///
/// Only the total byte count matters here; the header block stays
/// unparsed inside the payload.
fn decode_hmsg(buf: &mut ReadBuffer) -> DecodeResult<Decoded> {
    let tokens = header_tokens(buf)?;
    if tokens.len() < 4 || tokens[0] != HMSG {
        return Err(DecodeError::BadSyntax);
    }

    let (reply_to, length_token) = match tokens.len() {
        4 => return Err(DecodeError::MissingLength),
        5 => (None, tokens[4].as_str()),
        _ => (Some(tokens[3].clone()), tokens[5].as_str()),
    };

    let frame = Frame {
        subject: tokens[1].clone(),
        sid: tokens[2].clone(),
        reply_to,
        length: parse_length(length_token)?,
        payload: Vec::new(),
    };
    Ok(complete(buf, frame))
}

/// Completes a frame whose header is already decoded: either consumes
/// `length` payload bytes plus the 2-byte terminator (value not
/// validated), or reports the exact deficit without consuming anything.
fn complete(buf: &mut ReadBuffer, mut frame: Frame) -> Decoded {
    let required = frame.length + 2;
    let available = buf.available();
    if available < required {
        return Decoded::Incomplete(NeedMoreData {
            bytes: Some(required - available),
            partial: frame,
        });
    }

    match buf.read_exact(frame.length) {
        Some(payload) => {
            frame.payload = payload;
            buf.skip(2);
            Decoded::Complete(frame)
        }
        None => Decoded::Incomplete(NeedMoreData {
            bytes: Some(required - buf.available()),
            partial: frame,
        }),
    }
}

/// Reads one header line, enforcing the full CRLF terminator, and
/// returns it without the terminator.
fn header_line(buf: &mut ReadBuffer) -> DecodeResult<String> {
    let line = buf.read_line().ok_or(DecodeError::MalformedLine)?;
    match line.split_last() {
        Some((&b'\r', rest)) => {
            String::from_utf8(rest.to_vec()).map_err(|_| DecodeError::BadSyntax)
        }
        _ => Err(DecodeError::MalformedLine),
    }
}

fn header_tokens(buf: &mut ReadBuffer) -> DecodeResult<Vec<String>> {
    let line = header_line(buf)?;
    Ok(line.split_ascii_whitespace().map(str::to_owned).collect())
}

fn parse_length(token: &str) -> DecodeResult<usize> {
    let length: usize = token.parse().map_err(|_| DecodeError::InvalidLength {
        token: token.to_string(),
    })?;
    if length > MAX_PAYLOAD_SIZE {
        return Err(DecodeError::PayloadTooLarge {
            size: length,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    fn buffer(bytes: &[u8]) -> ReadBuffer {
        ReadBuffer::from(bytes)
    }

    #[test]
    fn complete_text_message() {
        let mut buf = buffer(b"MSG test.subject 10 3\r\nhi!\r\n");
        let decoded = decode(&mut buf).unwrap();
        assert_eq!(
            decoded,
            Decoded::Complete(Frame {
                subject: "test.subject".to_string(),
                sid: "10".to_string(),
                reply_to: None,
                length: 3,
                payload: b"hi!".to_vec(),
            })
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn message_with_reply_to() {
        let mut buf = buffer(b"MSG orders 7 orders.reply 2\r\nok\r\n");
        match decode(&mut buf).unwrap() {
            Decoded::Complete(frame) => {
                assert_eq!(frame.subject, "orders");
                assert_eq!(frame.sid, "7");
                assert_eq!(frame.reply_to.as_deref(), Some("orders.reply"));
                assert_eq!(frame.payload, b"ok");
            }
            other => panic!("expected complete frame, got {other:?}"),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_payload() {
        let mut buf = buffer(b"MSG beat 4 0\r\n\r\n");
        match decode(&mut buf).unwrap() {
            Decoded::Complete(frame) => {
                assert_eq!(frame.length, 0);
                assert!(frame.payload.is_empty());
            }
            other => panic!("expected complete frame, got {other:?}"),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn header_continuation_is_an_error() {
        let mut buf = buffer(b"MSG test.subject 10 ");
        assert_eq!(decode(&mut buf), Err(DecodeError::MalformedLine));
    }

    #[test]
    fn payload_continuation_reports_exact_deficit() {
        let mut buf = buffer(b"MSG test.subject 10 3\r\nh");
        let decoded = decode(&mut buf).unwrap();
        assert_eq!(
            decoded,
            Decoded::Incomplete(NeedMoreData {
                bytes: Some(4),
                partial: Frame {
                    subject: "test.subject".to_string(),
                    sid: "10".to_string(),
                    reply_to: None,
                    length: 3,
                    payload: Vec::new(),
                },
            })
        );
        // Payload region untouched.
        assert_eq!(buf.available(), 1);
    }

    #[test]
    fn resume_finishes_a_partial_frame() {
        let mut buf = buffer(b"MSG test.subject 10 3\r\nh");
        let partial = match decode(&mut buf).unwrap() {
            Decoded::Incomplete(nmd) => nmd.partial,
            other => panic!("expected deficit, got {other:?}"),
        };

        // One byte at a time: still short, deficit shrinks.
        buf.extend(b"i");
        match resume(&mut buf, partial) {
            Decoded::Incomplete(nmd) => {
                assert_eq!(nmd.bytes, Some(3));
                buf.extend(b"!\r\n");
                match resume(&mut buf, nmd.partial) {
                    Decoded::Complete(frame) => {
                        assert_eq!(frame.payload, b"hi!");
                        assert!(buf.is_empty());
                    }
                    other => panic!("expected complete frame, got {other:?}"),
                }
            }
            other => panic!("expected deficit, got {other:?}"),
        }
    }

    #[test]
    fn missing_terminator_counts_toward_deficit() {
        // Full payload buffered but no trailing terminator yet.
        let mut buf = buffer(b"MSG test.subject 10 3\r\nhi!");
        match decode(&mut buf).unwrap() {
            Decoded::Incomplete(nmd) => assert_eq!(nmd.bytes, Some(2)),
            other => panic!("expected deficit, got {other:?}"),
        }
        assert_eq!(buf.available(), 3);
    }

    #[test]
    fn malformed_bytes() {
        let mut buf = buffer(b"MSG test.subject 10 text\r\nhi!\r\n");
        assert_eq!(
            decode(&mut buf),
            Err(DecodeError::InvalidLength {
                token: "text".to_string()
            })
        );
    }

    #[test]
    fn negative_bytes_rejected() {
        let mut buf = buffer(b"MSG test.subject 10 -1\r\nhi!\r\n");
        assert!(matches!(
            decode(&mut buf),
            Err(DecodeError::InvalidLength { .. })
        ));
    }

    #[test]
    fn missing_bytes_specifier() {
        let mut buf = buffer(b"MSG test.subject 10\r\nhi!\r\n");
        assert_eq!(decode(&mut buf), Err(DecodeError::MissingLength));
    }

    #[test]
    fn missing_carriage_return() {
        let mut buf = buffer(b"MSG test.subject 10 3\nhi!\r\n");
        assert_eq!(decode(&mut buf), Err(DecodeError::MalformedLine));
    }

    #[test]
    fn missing_line_feed() {
        let mut buf = buffer(b"MSG test.subject 10 3\rhi!\r\n");
        assert_eq!(decode(&mut buf), Err(DecodeError::MalformedLine));
    }

    #[test]
    fn wrong_keyword() {
        let mut buf = buffer(b"MEG test.subject 10 3\r\nhi!\r\n");
        assert_eq!(decode(&mut buf), Err(DecodeError::BadSyntax));
    }

    #[test]
    fn too_few_tokens() {
        let mut buf = buffer(b"MSG test.subject\r\n");
        assert_eq!(decode(&mut buf), Err(DecodeError::BadSyntax));
    }

    #[test]
    fn oversized_length_rejected() {
        let mut buf = buffer(b"MSG big 1 999999999\r\n");
        assert!(matches!(
            decode(&mut buf),
            Err(DecodeError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn terminator_bytes_not_validated() {
        // The two bytes after the payload are skipped, whatever they are.
        let mut buf = buffer(b"MSG test.subject 10 3\r\nhi!XY");
        match decode(&mut buf).unwrap() {
            Decoded::Complete(frame) => assert_eq!(frame.payload, b"hi!"),
            other => panic!("expected complete frame, got {other:?}"),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn consecutive_messages_drain_in_order() {
        let mut buf = buffer(b"MSG a 1 2\r\nxx\r\nMSG b 2 1\r\ny\r\n");
        match decode(&mut buf).unwrap() {
            Decoded::Complete(frame) => assert_eq!(frame.subject, "a"),
            other => panic!("expected complete frame, got {other:?}"),
        }
        match decode(&mut buf).unwrap() {
            Decoded::Complete(frame) => {
                assert_eq!(frame.subject, "b");
                assert_eq!(frame.payload, b"y");
            }
            other => panic!("expected complete frame, got {other:?}"),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn publish_round_trip() {
        for payload in [&b""[..], &b"hello"[..], &b"bytes \x00\x01\x02"[..]] {
            let published = encode::publish("round.trip", None, payload);
            // Reframe the published payload the way the server would
            // deliver it to a subscriber with sid 5.
            let mut wire = format!("MSG round.trip 5 {}\r\n", payload.len()).into_bytes();
            let body_start = published.len() - payload.len() - 2;
            wire.extend_from_slice(&published[body_start..]);

            let mut buf = buffer(&wire);
            match decode(&mut buf).unwrap() {
                Decoded::Complete(frame) => {
                    assert_eq!(frame.subject, "round.trip");
                    assert_eq!(frame.payload, payload);
                }
                other => panic!("expected complete frame, got {other:?}"),
            }
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn classify_info() {
        let mut buf = buffer(b"INFO {\"server_name\":\"east-1\"}\r\n");
        assert_eq!(
            decode_frame(&mut buf).unwrap(),
            ServerFrame::Info("{\"server_name\":\"east-1\"}".to_string())
        );
    }

    #[test]
    fn classify_ping_pong() {
        let mut buf = buffer(b"PING\r\nPONG\r\n");
        assert_eq!(decode_frame(&mut buf).unwrap(), ServerFrame::Ping);
        assert_eq!(decode_frame(&mut buf).unwrap(), ServerFrame::Pong);
        assert!(buf.is_empty());
    }

    #[test]
    fn classify_ok_and_err() {
        let mut buf = buffer(b"+OK\r\n-ERR 'Unknown Protocol Operation'\r\n");
        assert_eq!(decode_frame(&mut buf).unwrap(), ServerFrame::Ok);
        assert_eq!(
            decode_frame(&mut buf).unwrap(),
            ServerFrame::Err("'Unknown Protocol Operation'".to_string())
        );
    }

    #[test]
    fn classify_msg_delegates_to_payload_path() {
        let mut buf = buffer(b"MSG test.subject 10 3\r\nhi!\r\n");
        match decode_frame(&mut buf).unwrap() {
            ServerFrame::Msg(Decoded::Complete(frame)) => assert_eq!(frame.payload, b"hi!"),
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn classify_unknown_command() {
        let mut buf = buffer(b"XYZ\r\n");
        assert_eq!(
            decode_frame(&mut buf),
            Err(DecodeError::UnknownCommand { byte: b'X' })
        );
    }

    #[test]
    fn hmsg_recognized_and_consumed() {
        // 12 header bytes + 5 payload bytes = 17 total.
        let mut buf =
            buffer(b"HMSG updates 9 12 17\r\nNATS/1.0\r\n\r\nhello\r\nPING\r\n");
        match decode_frame(&mut buf).unwrap() {
            ServerFrame::HMsg(Decoded::Complete(frame)) => {
                assert_eq!(frame.subject, "updates");
                assert_eq!(frame.length, 17);
            }
            other => panic!("expected headered message, got {other:?}"),
        }
        // Stream stays aligned on the next frame.
        assert_eq!(decode_frame(&mut buf).unwrap(), ServerFrame::Ping);
    }

    #[test]
    fn hmsg_with_reply_to() {
        let mut buf = buffer(b"HMSG updates 9 updates.reply 12 17\r\nNATS/1.0\r\n\r\nhello\r\n");
        match decode_frame(&mut buf).unwrap() {
            ServerFrame::HMsg(Decoded::Complete(frame)) => {
                assert_eq!(frame.reply_to.as_deref(), Some("updates.reply"));
            }
            other => panic!("expected headered message, got {other:?}"),
        }
    }
}
