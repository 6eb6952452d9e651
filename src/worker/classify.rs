//! Classification of raw response lines.
//!
//! A decoded response is either fatal (malformed line, worker-reported
//! error, wrong object count) or a single flattened object accompanied by
//! zero or more non-fatal warnings.

use tracing::debug;

use super::error::{CollectionError, CollectionResult};
use super::protocol::{FlatObject, RawResponse};

/// A successfully classified response.
#[derive(Debug)]
pub struct Classified {
    /// The single collected object, still in flattened wire form.
    pub object: FlatObject,
    /// Loading and parsing diagnostics, in emission order. These never
    /// abort the call; the caller decides how to report them.
    pub warnings: Vec<String>,
}

/// Decode and classify one raw response line.
///
/// Loading errors come first in the warning list, then parsing errors in
/// the order of their path keys.
///
/// # Errors
///
/// - [`CollectionError::Decode`] when the line is not valid JSON; the
///   offending line is carried in the error and the call is never retried.
/// - [`CollectionError::Worker`] when the response carries an `error`
///   field; the optional traceback rides along as diagnostic context.
/// - [`CollectionError::ObjectCount`] when `objects` does not hold exactly
///   one entry on a non-error response.
pub fn classify(line: &str) -> CollectionResult<Classified> {
    debug!("decoding response line");
    let response: RawResponse =
        serde_json::from_str(line).map_err(|source| CollectionError::Decode {
            source,
            line: line.trim_end().to_owned(),
        })?;

    if let Some(message) = response.error {
        return Err(CollectionError::Worker {
            message,
            traceback: response.traceback,
        });
    }

    let mut warnings = response.loading_errors;
    for (_path, errors) in response.parsing_errors.into_entries() {
        warnings.extend(errors);
    }

    let mut objects = response.objects;
    if objects.len() != 1 {
        return Err(CollectionError::ObjectCount(objects.len()));
    }
    let object = objects.remove(0);

    Ok(Classified { object, warnings })
}
