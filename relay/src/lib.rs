//! # Relay - WebRTC session core for a media relay
//!
//! Each [`WebRtcConnection`](connection::WebRtcConnection) represents one peer
//! of the relay. It merges the progress of its ICE streams and of the secure
//! channel running on top of them into a single connection state, and moves
//! RTP/RTCP between the peer and the rest of the relay:
//!
//! - media handed to the connection (as a [`MediaSink`](media::MediaSink)) is
//!   stamped with the connection's own SSRCs, unwrapped from RED when the peer
//!   did not negotiate it, and queued for a dedicated send thread;
//! - media received from the peer is dispatched by SSRC (bundle) or by
//!   transport to the sinks attached to the connection;
//! - receiver feedback is forwarded, and every Full Intra Request seen on the
//!   way triggers one of our own towards the media source.
//!
//! Session description text, the ICE agent and the DTLS-SRTP layer are
//! collaborators supplied by the application through
//! [`SdpWriter`](description::SdpWriter), [`IceAgent`](ice::IceAgent) and
//! [`SecureChannel`](transport::SecureChannel).
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relay::configuration::RelayConfigBuilder;
//! use relay::connection::WebRtcConnection;
//! use relay::description::{LocalDescription, RemoteDescription, SdpWriter};
//! use relay::event::{ConnectionEvent, ConnectionEventListener};
//! use relay::ice::IceAgent;
//! use relay::shared::MediaKind;
//! use relay::shared::error::Result;
//! use relay::transport::IceTransportFactory;
//!
//! # fn new_agent(_kind: MediaKind) -> Result<Arc<dyn IceAgent>> { todo!() }
//! # fn parse_offer() -> RemoteDescription { todo!() }
//! struct Signaling;
//!
//! impl ConnectionEventListener for Signaling {
//!     fn notify_event(&self, event: ConnectionEvent, message: &str) {
//!         println!("{event}: {message}");
//!     }
//! }
//!
//! struct Writer;
//!
//! impl SdpWriter for Writer {
//!     fn write(&self, description: &LocalDescription) -> Result<String> {
//!         Ok(format!("{description:?}"))
//!     }
//! }
//!
//! # fn example() -> Result<()> {
//! let config = RelayConfigBuilder::new()
//!     .with_stun_server("stun.l.google.com", 19302)
//!     .with_port_range(40000, 40100)
//!     .build();
//!
//! let factory = Arc::new(IceTransportFactory::insecure(config.ice_config(), new_agent));
//! let publisher = WebRtcConnection::new(config.clone(), factory.clone(), Arc::new(Writer))?;
//! let subscriber = WebRtcConnection::new(config, factory, Arc::new(Writer))?;
//!
//! // media and feedback flow between the two peers
//! publisher.set_video_sink(Some(subscriber.clone()));
//! publisher.set_audio_sink(Some(subscriber.clone()));
//! subscriber.set_feedback_sink(Some(publisher.clone()));
//!
//! publisher.set_event_listener(Some(Arc::new(Signaling)));
//! publisher.set_remote_description(parse_offer())?;
//! publisher.add_remote_candidate_line(
//!     "video",
//!     "candidate:1 1 udp 2013266431 192.168.1.2 40000 typ host generation 0",
//! )?;
//!
//! // sinks hold their targets; closing detaches them
//! publisher.close();
//! subscriber.close();
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub use {ice, rtcp, rtp, shared};

pub mod configuration;
pub mod connection;
pub mod description;
pub mod event;
pub mod media;
pub mod pipeline;
pub mod state;
pub mod transport;
