//! Binary envelope for values crossing the peer channel.
//!
//! A successful fetch response carries the raw value bytes inside a single
//! protobuf message, so the payload survives proxies that mangle bare
//! binary bodies and leaves room to grow fields without breaking peers.

/// Body of a successful peer fetch response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchResponse {
    /// Raw value bytes for the requested key.
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
}
