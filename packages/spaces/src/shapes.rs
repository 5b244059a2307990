//! Domain shapes shared across the namespaces.

use placehub_core::Shape;

/// A user id: 64 bits as 16 lowercase hex chars.
pub fn uid() -> Shape {
    Shape::hex(16)
}

/// An ed25519 public key: 64 lowercase hex chars.
pub fn pubkey() -> Shape {
    Shape::hex(64)
}

/// A place timestamp key: minutes since the epoch, 32 bits as 8 hex chars.
/// Overflows in 135 years.
pub fn tskey() -> Shape {
    Shape::hex(8)
}

/// A human-readable timestamp: `yyyy-mm-dd-hh-mm-ss`. Lexicographic order
/// is chronological order, which the unread-marker cascade relies on.
pub fn jsontime() -> Shape {
    Shape::text(r"^\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}$")
}

/// Unix seconds between 2000-01-01 and 2100-01-01.
pub fn timesec() -> Shape {
    Shape::number(946_684_800.0, 4_102_444_800.0)
}

/// Latitude in degrees.
pub fn lat() -> Shape {
    Shape::number(-90.0, 90.0)
}

/// Longitude in degrees.
pub fn lon() -> Shape {
    Shape::number(-180.0, 180.0)
}

/// A display name.
pub fn name() -> Shape {
    Shape::text(r"^\w{3,20}$")
}

/// Printable ASCII of any length.
pub fn text() -> Shape {
    Shape::text(r"^[\x20-\x7e]*$")
}

/// A base64 data URL carrying the given mime type.
pub fn dataurl(mime: &str) -> Shape {
    Shape::text(&format!(r"^data:{};base64,[\w+/=]+$", regex::escape(mime)))
}

/// The whole users namespace: uid -> per-user subtree.
///
/// Messages from u1 to u2 live under `/users/<u1>/chats/<u2>/<time>/text`
/// (u2 reads that dir for incoming messages); the unread marker for
/// messages from u2 sits at `/users/<u1>/unread/<u2>` and is deleted once
/// seen; abuse reports from u1 about u2 go to `/users/<u1>/reports/<u2>`.
pub fn user_schema() -> Shape {
    Shape::keyval(
        uid(),
        Shape::subset([
            (
                "profile",
                Shape::subset([
                    ("id", uid()),
                    ("name", name()),
                    ("info", Shape::ascii(0, 1024)),
                    ("img", dataurl("image/jpeg")),
                    ("pubkey", pubkey()),
                ]),
            ),
            (
                "places",
                Shape::keyval(
                    tskey(),
                    Shape::subset([("time", timesec()), ("lat", lat()), ("lon", lon())]),
                ),
            ),
            ("feedbacks", Shape::keyval(jsontime(), Shape::ascii(0, 1024))),
            ("reports", Shape::keyval(uid(), Shape::ascii(0, 1024))),
            (
                "chats",
                Shape::keyval(
                    uid(),
                    Shape::keyval(jsontime(), Shape::dict([("text", text())])),
                ),
            ),
            ("unread", Shape::keyval(uid(), Shape::null_or(jsontime()))),
        ]),
    )
}
