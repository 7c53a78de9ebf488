use std::borrow::Cow;

/// Errors surfaced by the persistence port (C9) and the activation engine (C8).
#[mhub_derive::mhub_error]
pub enum ActivationError {
    /// No license, or no activation, with the given id exists.
    #[error("not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The request was malformed for this license's type (e.g. no hardware id for a
    /// `NodeLocked` activation).
    #[error("bad request{}: {message}", format_context(.context))]
    BadRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The seat pool is full; no more concurrent activations are available.
    #[error("maximum activations reached{}: {message}", format_context(.context))]
    MaximumActivationsReached { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The license has expired.
    #[error("license has expired{}: {message}", format_context(.context))]
    Expired { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The license has been revoked and revocation is terminal for this variant.
    #[error("license has been revoked{}: {message}", format_context(.context))]
    Revoked { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Envelope codec or license construction failure.
    #[error("license codec error{}: {source}", format_context(.context))]
    Codec {
        #[source]
        source: mhub_licensing::LicenseError,
        context: Option<Cow<'static, str>>,
    },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("internal activation engine error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
