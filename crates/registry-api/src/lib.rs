//! HTTP adapter for the registry: caller identity from a header, JSON envelopes out.

pub mod server;
