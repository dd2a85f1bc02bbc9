use tracing::error;

use crate::telemetry::error::{BoxError, ShutdownError};

/// Fold teardown results from independent subsystems into one error.
///
/// An aggregated [`ShutdownError`] is flattened so the combined error lists every
/// underlying failure once.
pub fn combine<I>(results: I) -> Result<(), ShutdownError>
where
    I: IntoIterator<Item = Result<(), BoxError>>,
{
    let mut failures = Vec::new();
    for result in results {
        let Err(err) = result else { continue };
        match err.downcast::<ShutdownError>() {
            Ok(aggregate) => failures.extend(aggregate.into_failures()),
            Err(other) => failures.push(other),
        }
    }

    match ShutdownError::from_failures(failures) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Terminate the process when any teardown failed.
///
/// Meant to be the last call in `main`; shutdown failures are never ignored.
pub fn safe_shutdown<I>(results: I)
where
    I: IntoIterator<Item = Result<(), BoxError>>,
{
    if let Err(err) = combine(results) {
        error!(event = "FailedToShutdown", failures = err.len(), "{}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
