use std::borrow::Cow;

/// Error kinds surfaced by the crypto primitives (C1), the envelope codec (C2), the
/// serializer port (C3), and the validation rule registry (C5).
#[mhub_derive::mhub_error]
pub enum LicenseError {
    /// The envelope's signature did not verify, or its recomputed hash did not match
    /// the stored one — either way the envelope has been tampered with.
    #[error("license signature is invalid or the envelope was tampered with{}: {message}", format_context(.context))]
    InvalidLicenseSignature { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Envelope length framing was malformed, or the serializer could not parse the
    /// payload, or an unknown variant discriminator was encountered.
    #[error("license envelope or payload is malformed{}: {message}", format_context(.context))]
    InvalidLicenseFormat { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Time-based expiry, or a trial period has elapsed.
    #[error("license has expired{}: {message}", format_context(.context))]
    ExpiredLicense { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// `NodeLocked` hardware id did not match the current machine.
    #[error("hardware id does not match this license{}: {message}", format_context(.context))]
    HardwareMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// `Standard` user name or license key did not match the supplied parameters.
    #[error("user or license key does not match this license{}: {message}", format_context(.context))]
    UserMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A license construction invariant was violated (e.g. a non-positive trial period).
    #[error("license is invalid{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The secrets file was corrupt, missing, or could not be decrypted.
    #[error("key management error{}: {message}", format_context(.context))]
    KeyManagement { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Serde (de)serialization failure, wrapped with context.
    #[error("serialization error{}: {source}", format_context(.context))]
    Serialize {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Internal fallback for unexpected issues or logic errors. Never includes key
    /// material: cryptographic failures are normalized to one of the variants above.
    #[error("internal licensing error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
