//! XML codec

pub mod codec;

pub use codec::QuickXmlCodec;
