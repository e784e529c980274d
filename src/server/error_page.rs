use crate::enums::Status;
use super::Response;

const PART1: &'static str = "\
    <!DOCTYPE html>\
    <html>\
        <head>\
            <title>\
    ";
const PART2: &'static str = "\
            </title>\
        </head>\
        <body>\
            <h1>\
    ";
const PART3: &'static str = concat!("\
            </h1>\
            <hr>\
            <p>Yours faithfully,<br>\
                tk-duplex/", env!("CARGO_PKG_VERSION"), "\
            </p>\
        </body>\
    </html>\
    ");

/// Generates response with default error page
///
/// Used by the server for malformed requests, unknown routes and handler
/// errors. Handlers may return it too.
pub fn error_page(status: Status) -> Response {
    let code = status.code();
    let reason = status.reason();
    let body = format!("{p1}{code:03} {status}{p2}{code:03} {status}{p3}",
        code=code, status=reason, p1=PART1, p2=PART2, p3=PART3);
    Response::new(status)
        .header("Content-Type", "text/html")
        .body(body)
}
