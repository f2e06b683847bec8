use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all possible error conditions that can occur while decoding or encoding
/// ROOT-style binary containers. Each variant provides specific context about the failure
/// mode to enable appropriate error handling.
///
/// # Error Categories
///
/// ## Buffer Protocol Errors
/// - [`Error::OutOfBounds`] - Attempted to read or write beyond buffer boundaries
/// - [`Error::Malformed`] - Corrupted or invalid byte stream structure
/// - [`Error::ByteCount`] - A versioned block's byte-count frame did not match the bytes consumed
/// - [`Error::Empty`] - Empty input provided
///
/// ## Dispatch Errors
/// - [`Error::UnknownClass`] - A type tag named a class with no registered constructor
///
/// ## Leaf Binding Errors
/// - [`Error::BindingMismatch`] - Destination shape incompatible with the on-disk column kind
/// - [`Error::MalformedCount`] - A count leaf produced an invalid run length
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors, rendered to text so the error stays `Clone`
///
/// The whole enum is `Clone`: a poisoned buffer stores its first error once and hands the
/// same error back from every later accessor call.
///
/// # Examples
///
/// ```rust
/// use rootscope::{Error, ReadBuffer};
///
/// let mut r = ReadBuffer::new(&[0x40]);
/// let (_vers, _pos, _bcnt) = r.read_version();
/// match r.err() {
///     Some(Error::OutOfBounds) => eprintln!("truncated stream"),
///     Some(e) => eprintln!("decode failed: {e}"),
///     None => {}
/// }
/// ```
#[derive(Error, Debug, Clone)]
pub enum Error {
    // Buffer protocol errors
    /// The byte stream is damaged and could not be decoded.
    ///
    /// This error indicates that the stream structure does not conform to the
    /// container format. The error includes the source location where the
    /// malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted on a buffer.
    ///
    /// This error occurs when trying to read data beyond the end of the byte
    /// region, or when a seek targets a position outside it. It's a safety
    /// check to prevent buffer overruns during decoding.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A versioned block's byte-count frame did not match the bytes actually consumed.
    ///
    /// Every versioned block is wrapped with a total-byte-count field that is
    /// validated after the payload has been read. A mismatch indicates stream
    /// corruption or a version-handling bug, and is always fatal to the current
    /// decode.
    #[error("byte-count mismatch for {class}: declared {expected}, consumed {actual}")]
    ByteCount {
        /// On-disk class name of the block that failed validation
        class: String,
        /// Byte count declared by the frame
        expected: u32,
        /// Bytes actually consumed by the decode
        actual: u32,
    },

    /// A polymorphic type tag named a class with no registered constructor.
    ///
    /// Every concrete serializable type must register `(class name, constructor)`
    /// with the factory at startup; an on-disk instance of an unregistered class
    /// cannot be materialized.
    #[error("no constructor registered for class {0:?}")]
    UnknownClass(String),

    /// A leaf was bound to a destination whose shape does not match its on-disk kind.
    ///
    /// Raised at bind time, before any row I/O is attempted, so a mismatch can
    /// never corrupt partially-read data.
    #[error("leaf {leaf:?}: cannot bind {kind} column to {target} destination")]
    BindingMismatch {
        /// Name of the leaf that failed to bind
        leaf: String,
        /// Declared on-disk kind of the column
        kind: String,
        /// Description of the destination that was offered
        target: String,
    },

    /// A count leaf produced an invalid run length for the current row.
    #[error("leaf {leaf:?}: invalid run length {value}")]
    MalformedCount {
        /// Name of the variable-length leaf whose count resolution failed
        leaf: String,
        /// The offending count value
        value: i64,
    },

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while mapping byte regions from
    /// disk. The message is rendered to text so that the error remains `Clone`
    /// for the sticky-buffer policy.
    #[error("{0}")]
    FileError(String),

    /// Provided input was empty.
    ///
    /// This error occurs when an empty byte region is provided where serialized
    /// container data was expected.
    #[error("Provided input was empty")]
    Empty,

    /// This feature of the container format is not supported.
    #[error("This feature is not supported")]
    NotSupported,
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileError(error.to_string())
    }
}

/// Convenience `Result` type used by all fallible operations of this crate.
pub type Result<T> = std::result::Result<T, Error>;
