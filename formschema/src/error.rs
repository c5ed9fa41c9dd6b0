//! Error types for schema processing, remote inlining and the properties codec.

use thiserror::Error;

/// Errors raised while walking or classifying a schema document.
///
/// All of these are configuration errors: the schema itself is malformed or
/// uses a construct the engine does not support, so processing stops.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A node declares `type` as a list of primitive types.
    #[error("unsupported union type at `{path}`: {types}")]
    UnionType { path: String, types: String },

    /// A node declares a `type` name outside the draft-07 primitives.
    #[error("unknown type `{type_name}` at `{path}`")]
    UnknownType { path: String, type_name: String },

    /// A `$ref` that is not a same-document `#/definitions/...` pointer.
    #[error("unsupported $ref `{reference}` at `{path}`")]
    UnsupportedRef { path: String, reference: String },

    /// A `$ref` whose pointer does not dereference.
    #[error("cannot resolve $ref `{reference}` at `{path}`")]
    UnresolvedRef { path: String, reference: String },
}

/// Errors raised while fetching and inlining remote schemas.
#[derive(Debug, Error)]
pub enum InlineError {
    /// The server answered with a non-success status.
    #[error("failed to fetch {url} from {fetched_url}: {status}")]
    Http {
        url: String,
        fetched_url: String,
        status: u16,
    },

    /// The request could not be sent or the body could not be read.
    #[error("failed to fetch {url}: {message}")]
    Request { url: String, message: String },

    /// The fetched body is not a JSON document.
    #[error("invalid JSON schema document at {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The pointer fragment of the requested reference does not exist.
    #[error("could not find {anchor} in {url}")]
    AnchorNotFound { anchor: String, url: String },

    /// No fragment was given and the document has no top-level `properties`.
    #[error("schema URL {url} must have an anchor when the top-level schema has no properties")]
    AmbiguousRoot { url: String },

    /// A `$ref` that is neither local nor an absolute http(s) URL.
    #[error("unsupported $ref `{reference}`")]
    UnsupportedRef { reference: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors raised while reading `.properties` text.
#[derive(Debug, Error)]
pub enum PropertiesError {
    /// The text is not valid `.properties` syntax, such as a bad `\uXXXX`
    /// escape.
    #[error("invalid .properties text: {0}")]
    Read(#[from] java_properties::PropertiesError),
}
