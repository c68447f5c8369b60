
use ice::Candidate;
use log::{debug, error, info, trace, warn};
use rtcp::header::{PacketType, is_feedback, media_source_ssrc, sender_ssrc};
use rtcp::{FirSequence, FullIntraRequest, rewrite_compound, strip_fir};
use rtp::red::{RED_PAYLOAD_TYPE, unwrap_red};
use shared::error::{Error, Result};
use shared::marshal::Marshal;
use shared::util::is_rtcp;
use shared::{MediaKind, PacketBuffer};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::configuration::RelayConfig;
use crate::description::{
    IceCredentials, LocalDescription, MediaSection, RemoteDescription, SdpWriter,
};
use crate::event::{CandidateMessage, ConnectionEvent, ConnectionEventListener};
use crate::media::{FeedbackSink, MediaSink};
use crate::pipeline::{OutboundPacket, SendPipeline};
use crate::state::{ConnectionState, TransportState, next_connection_state};
use crate::transport::{Transport, TransportFactory, TransportListener, TransportSet};

/// One peer connection of the relay.
///
/// Owns the audio and video transports negotiated from the remote description,
/// merges their readiness into a single `ConnectionState`, rewrites the SSRCs
/// of every packet crossing it and queues outbound packets for the send thread.
///
/// Media handed to the connection through `MediaSink`/`FeedbackSink` goes to
/// the remote peer; media received from the peer is passed to the sinks set
/// with `set_audio_sink`, `set_video_sink` and `set_feedback_sink`.
pub struct WebRtcConnection {
    config: RelayConfig,
    factory: Arc<dyn TransportFactory>,
    sdp_writer: Arc<dyn SdpWriter>,

    transports: Arc<TransportSet>,
    pipeline: SendPipeline,

    remote: RwLock<Option<RemoteDescription>>,
    rtcp_mux: AtomicBool,
    audio_source_ssrc: AtomicU32,
    video_source_ssrc: AtomicU32,
    fir_sequence: FirSequence,

    audio_sink: RwLock<Option<Arc<dyn MediaSink>>>,
    video_sink: RwLock<Option<Arc<dyn MediaSink>>>,
    feedback_sink: RwLock<Option<Arc<dyn FeedbackSink>>>,
    event_listener: RwLock<Option<Arc<dyn ConnectionEventListener>>>,

    state: AtomicU8,
    state_lock: Mutex<()>,
    receive_lock: Mutex<()>,
    closed: AtomicBool,

    weak_self: Weak<WebRtcConnection>,
}

impl WebRtcConnection {
    /// Creates an idle connection and its send thread. Transports are only
    /// built by `set_remote_description`.
    pub fn new(
        config: RelayConfig,
        factory: Arc<dyn TransportFactory>,
        sdp_writer: Arc<dyn SdpWriter>,
    ) -> Result<Arc<Self>> {
        info!(
            "creating connection, stun server {}:{}, port range {}-{}",
            config.stun_server, config.stun_port, config.min_port, config.max_port
        );

        let transports = Arc::new(TransportSet::new());
        let pipeline = SendPipeline::new(config.send_queue_capacity, transports.clone())?;

        Ok(Arc::new_cyclic(|weak_self| WebRtcConnection {
            config,
            factory,
            sdp_writer,
            transports,
            pipeline,
            remote: RwLock::new(None),
            rtcp_mux: AtomicBool::new(false),
            audio_source_ssrc: AtomicU32::new(0),
            video_source_ssrc: AtomicU32::new(0),
            fir_sequence: FirSequence::new(),
            audio_sink: RwLock::new(None),
            video_sink: RwLock::new(None),
            feedback_sink: RwLock::new(None),
            event_listener: RwLock::new(None),
            state: AtomicU8::new(ConnectionState::Initial.into()),
            state_lock: Mutex::new(()),
            receive_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            weak_self: weak_self.clone(),
        }))
    }

    /// Applies the remote offer: bundle and rtcp-mux flags, announced source
    /// SSRCs and payload map. Creates and starts the video transport when the
    /// offer has video and the audio transport when it has audio and is not
    /// bundled, then installs the candidates the offer carries.
    pub fn set_remote_description(&self, remote: RemoteDescription) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let mut created = vec![];
        let candidates = remote.candidates.clone();
        {
            let mut slot = self.remote.write()?;
            if slot.is_some() {
                return Err(Error::ErrRemoteDescriptionAlreadySet);
            }

            debug!(
                "remote description: video {} ssrc {}, audio {} ssrc {}, bundle {}, rtcp-mux {}",
                remote.has_video,
                remote.video_ssrc,
                remote.has_audio,
                remote.audio_ssrc,
                remote.bundle,
                remote.rtcp_mux
            );
            self.transports.set_bundle(remote.bundle);
            self.rtcp_mux.store(remote.rtcp_mux, Ordering::SeqCst);
            self.video_source_ssrc
                .store(remote.video_ssrc, Ordering::SeqCst);
            self.audio_source_ssrc
                .store(remote.audio_ssrc, Ordering::SeqCst);

            let listener: Weak<dyn TransportListener> = self.weak_self.clone();
            if remote.has_video {
                let video = self
                    .factory
                    .create(MediaKind::Video, remote.rtcp_mux, listener.clone())?;
                self.transports.insert(MediaKind::Video, video.clone())?;
                created.push(video);
            }
            if remote.has_audio && !remote.bundle {
                let audio = self
                    .factory
                    .create(MediaKind::Audio, remote.rtcp_mux, listener)?;
                self.transports.insert(MediaKind::Audio, audio.clone())?;
                created.push(audio);
            }

            *slot = Some(remote);
        }

        for transport in &created {
            transport.start()?;
        }

        let (audio, video): (Vec<Candidate>, Vec<Candidate>) = candidates
            .into_iter()
            .partition(|c| c.media_kind == MediaKind::Audio);
        if !audio.is_empty() {
            self.add_remote_candidates(MediaKind::Audio.mid(), &audio)?;
        }
        if !video.is_empty() {
            self.add_remote_candidates(MediaKind::Video.mid(), &video)?;
        }

        Ok(())
    }

    /// Hands remote candidates to the transport serving `mid`: the audio
    /// transport for `audio` when not bundled, the video transport otherwise.
    /// Candidates without credentials get those of the remote description.
    pub fn add_remote_candidates(&self, mid: &str, candidates: &[Candidate]) -> Result<()> {
        let credentials = match self.remote.read()?.as_ref() {
            Some(remote) => remote.credentials.clone(),
            None => return Err(Error::ErrNoRemoteDescription),
        };

        let media_kind = if mid == MediaKind::Audio.mid() && !self.is_bundle() {
            MediaKind::Audio
        } else {
            MediaKind::Video
        };
        let transport = self
            .transports
            .get(media_kind)
            .ok_or_else(|| Error::ErrNoTransport(media_kind.to_string()))?;

        let candidates: Vec<Candidate> = candidates
            .iter()
            .cloned()
            .map(|mut c| {
                if c.username.is_empty() {
                    c.username = credentials.ufrag.clone();
                    c.password = credentials.pwd.clone();
                }
                c
            })
            .collect();

        transport.set_remote_candidates(&candidates)
    }

    /// Parses a trickled `a=candidate` value and adds it for `mid`.
    pub fn add_remote_candidate_line(&self, mid: &str, line: &str) -> Result<()> {
        let media_kind = if mid == MediaKind::Audio.mid() {
            MediaKind::Audio
        } else {
            MediaKind::Video
        };
        let mut candidate = Candidate::unmarshal(line, media_kind)?;
        candidate.transport_name = mid.to_owned();
        self.add_remote_candidates(mid, &[candidate])
    }

    /// Renders the local answer from the current transports.
    pub fn local_description(&self) -> Result<String> {
        let description = {
            let remote = self.remote.read()?;
            let Some(remote) = remote.as_ref() else {
                return Err(Error::ErrNoRemoteDescription);
            };

            let section = |media_kind: MediaKind, ssrc: u32| -> MediaSection {
                let (credentials, candidates) = match self.transports.route(media_kind) {
                    Some(transport) => {
                        let (ufrag, pwd) = transport.local_credentials();
                        (IceCredentials { ufrag, pwd }, transport.local_candidates())
                    }
                    None => (IceCredentials::default(), vec![]),
                };
                MediaSection {
                    media_kind,
                    ssrc,
                    credentials,
                    candidates,
                    payloads: remote.payloads_of(media_kind),
                }
            };

            LocalDescription {
                bundle: remote.bundle,
                rtcp_mux: remote.rtcp_mux,
                audio: remote
                    .has_audio
                    .then(|| section(MediaKind::Audio, self.config.audio_sink_ssrc)),
                video: remote
                    .has_video
                    .then(|| section(MediaKind::Video, self.config.video_sink_ssrc)),
            }
        };

        self.sdp_writer.write(&description)
    }

    pub fn current_state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_bundle(&self) -> bool {
        self.transports.is_bundle()
    }

    pub fn is_rtcp_mux(&self) -> bool {
        self.rtcp_mux.load(Ordering::SeqCst)
    }

    pub fn audio_sink_ssrc(&self) -> u32 {
        self.config.audio_sink_ssrc
    }

    pub fn video_sink_ssrc(&self) -> u32 {
        self.config.video_sink_ssrc
    }

    pub fn audio_source_ssrc(&self) -> u32 {
        self.audio_source_ssrc.load(Ordering::SeqCst)
    }

    pub fn video_source_ssrc(&self) -> u32 {
        self.video_source_ssrc.load(Ordering::SeqCst)
    }

    /// Packets waiting in the send queue.
    pub fn pending_packets(&self) -> usize {
        self.pipeline.len()
    }

    pub fn transport(&self, media_kind: MediaKind) -> Option<Arc<dyn Transport>> {
        self.transports.get(media_kind)
    }

    pub fn set_audio_sink(&self, sink: Option<Arc<dyn MediaSink>>) {
        set_slot(&self.audio_sink, sink);
    }

    pub fn set_video_sink(&self, sink: Option<Arc<dyn MediaSink>>) {
        set_slot(&self.video_sink, sink);
    }

    pub fn set_feedback_sink(&self, sink: Option<Arc<dyn FeedbackSink>>) {
        set_slot(&self.feedback_sink, sink);
    }

    pub fn set_event_listener(&self, listener: Option<Arc<dyn ConnectionEventListener>>) {
        set_slot(&self.event_listener, listener);
    }

    /// Builds a Full Intra Request for the remote video source and writes it
    /// straight to the video transport. Returns the request length.
    pub fn send_fir_packet(&self) -> usize {
        let fir = FullIntraRequest {
            sender_ssrc: self.config.video_sink_ssrc,
            media_ssrc: self.video_source_ssrc(),
            sequence_number: self.fir_sequence.next(),
        };
        debug!("generating {fir}");

        let raw = match fir.marshal() {
            Ok(raw) => raw,
            Err(err) => {
                error!("failed to marshal FIR: {err}");
                return 0;
            }
        };
        if let Some(video) = self.transports.video() {
            if let Err(err) = video.write(&raw) {
                debug!("failed to send FIR: {err}");
            }
        }
        raw.len()
    }

    /// Stamps `ssrc` on an RTP packet, or on every report of a compound RTCP
    /// packet. Each Full Intra Request found triggers one of our own; returns
    /// how many were answered that way.
    pub fn write_ssrc(&self, data: &mut [u8], ssrc: u32) -> Result<usize> {
        if is_rtcp(data) {
            let rewrite = rewrite_compound(data, ssrc)?;
            for _ in 0..rewrite.fir_requests {
                self.send_fir_packet();
            }
            Ok(rewrite.fir_requests)
        } else {
            rtp::header::set_ssrc(data, ssrc)?;
            Ok(0)
        }
    }

    /// Tears the connection down: sinks are detached, the send thread is
    /// joined, transports are closed and Finished is notified once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("closing connection");

        set_slot(&self.audio_sink, None);
        set_slot(&self.video_sink, None);
        set_slot(&self.feedback_sink, None);

        self.pipeline.shutdown();
        for transport in self.transports.take_all() {
            transport.close();
        }

        self.state
            .store(ConnectionState::Finished.into(), Ordering::SeqCst);
        let listener = match self.event_listener.write() {
            Ok(mut listener) => listener.take(),
            Err(err) => {
                error!("event listener: {err}");
                None
            }
        };
        if let Some(listener) = listener {
            listener.notify_event(ConnectionEvent::Finished, "");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn is_halted(&self) -> bool {
        self.is_closed() || self.current_state() == ConnectionState::Failed
    }

    fn has_sinks(&self) -> bool {
        get_slot(&self.audio_sink).is_some()
            || get_slot(&self.video_sink).is_some()
            || get_slot(&self.feedback_sink).is_some()
    }

    fn remote_supports(&self, payload_type: u8) -> bool {
        self.remote
            .read()
            .ok()
            .and_then(|r| r.as_ref().map(|r| r.supports_payload_type(payload_type)))
            .unwrap_or(false)
    }

    /// Copies `data` into the send queue as a packet for `media_kind`.
    /// Nothing is queued while no sink is attached.
    fn queue_data(&self, media_kind: MediaKind, data: &[u8]) {
        if !self.has_sinks() {
            trace!("no sink attached, dropping {media_kind} packet");
            return;
        }

        let data = match PacketBuffer::from_slice(data) {
            Ok(data) => data,
            Err(err) => {
                debug!("dropping {} byte {media_kind} packet: {err}", data.len());
                return;
            }
        };
        if let Err(err) = self.pipeline.try_enqueue(OutboundPacket { media_kind, data }) {
            trace!("{media_kind} packet not queued: {err}");
        }
    }

    fn emit(&self, event: ConnectionEvent, message: &str) {
        if let Some(listener) = get_slot(&self.event_listener) {
            listener.notify_event(event, message);
        }
    }
}

impl MediaSink for WebRtcConnection {
    fn deliver_audio_data(&self, data: &mut [u8]) -> usize {
        if self.is_halted() {
            return 0;
        }
        if let Err(err) = self.write_ssrc(data, self.config.audio_sink_ssrc) {
            debug!("dropping audio packet: {err}");
            return 0;
        }

        if self.config.audio_enabled {
            if let Some(transport) = self.transports.route(MediaKind::Audio) {
                self.queue_data(transport.media_kind(), data);
            }
        }
        data.len()
    }

    fn deliver_video_data(&self, data: &mut [u8]) -> usize {
        if self.is_halted() {
            return 0;
        }
        if let Err(err) = self.write_ssrc(data, self.config.video_sink_ssrc) {
            debug!("dropping video packet: {err}");
            return 0;
        }

        let Some(transport) = self.transports.video() else {
            return data.len();
        };
        if !self.config.video_enabled {
            return data.len();
        }

        if !is_rtcp(data)
            && rtp::header::payload_type(data) == Ok(RED_PAYLOAD_TYPE)
            && !self.remote_supports(RED_PAYLOAD_TYPE)
        {
            return match unwrap_red(data) {
                Ok(unwrapped) => {
                    self.queue_data(transport.media_kind(), &unwrapped);
                    unwrapped.len()
                }
                Err(err) => {
                    debug!("dropping malformed RED packet: {err}");
                    0
                }
            };
        }

        self.queue_data(transport.media_kind(), data);
        data.len()
    }
}

impl FeedbackSink for WebRtcConnection {
    fn deliver_feedback(&self, data: &mut [u8]) -> usize {
        if self.is_halted() {
            return 0;
        }

        // reports without a media source, such as an empty RR, count as video
        let ssrc = match media_source_ssrc(data) {
            Ok(source) if source == self.audio_source_ssrc() => self.config.audio_sink_ssrc,
            _ => self.config.video_sink_ssrc,
        };
        let answered = match self.write_ssrc(data, ssrc) {
            Ok(answered) => answered,
            Err(err) => {
                debug!("dropping feedback: {err}");
                return 0;
            }
        };

        let Some(transport) = self.transports.video() else {
            return data.len();
        };
        if answered == 0 {
            self.queue_data(transport.media_kind(), data);
            return data.len();
        }

        // answered FIRs are not passed on to the peer
        match strip_fir(data) {
            Ok(rest) if rest.is_empty() => trace!("answered {answered} FIR locally"),
            Ok(rest) => self.queue_data(transport.media_kind(), &rest),
            Err(err) => {
                debug!("dropping feedback: {err}");
                return 0;
            }
        }
        data.len()
    }
}

impl TransportListener for WebRtcConnection {
    fn on_transport_data(&self, data: &mut [u8], transport: &dyn Transport) {
        if !self.has_sinks() {
            return;
        }
        let Ok(_guard) = self.receive_lock.lock() else {
            error!("receive lock poisoned");
            return;
        };

        if is_feedback(data) {
            if let Some(sink) = get_slot(&self.feedback_sink) {
                sink.deliver_feedback(data);
            }
            return;
        }

        let received = match inbound_ssrc(data) {
            Ok(ssrc) => ssrc,
            Err(err) => {
                debug!("{} - dropping packet: {err}", transport.transport_name());
                return;
            }
        };

        if self.is_bundle() {
            if received == self.video_source_ssrc() || received == self.config.video_sink_ssrc {
                if let Some(sink) = get_slot(&self.video_sink) {
                    sink.deliver_video_data(data);
                }
            } else if received == self.audio_source_ssrc()
                || received == self.config.audio_sink_ssrc
            {
                if let Some(sink) = get_slot(&self.audio_sink) {
                    sink.deliver_audio_data(data);
                }
            } else {
                error!(
                    "unknown SSRC {received}, video source {}, video sink {}, ignoring",
                    self.video_source_ssrc(),
                    self.config.video_sink_ssrc
                );
            }
            return;
        }

        let (sink, source, sink_ssrc) = match transport.media_kind() {
            MediaKind::Audio => (
                get_slot(&self.audio_sink),
                &self.audio_source_ssrc,
                self.config.audio_sink_ssrc,
            ),
            MediaKind::Video => (
                get_slot(&self.video_sink),
                &self.video_source_ssrc,
                self.config.video_sink_ssrc,
            ),
        };
        let Some(sink) = sink else {
            return;
        };

        if source
            .compare_exchange(0, received, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!(
                "{} - source SSRC is {received}",
                transport.transport_name()
            );
        }

        let stamped = if is_rtcp(data) {
            rewrite_compound(data, sink_ssrc).map(|_| ())
        } else {
            rtp::header::set_ssrc(data, sink_ssrc)
        };
        if let Err(err) = stamped {
            debug!("{} - dropping packet: {err}", transport.transport_name());
            return;
        }

        match transport.media_kind() {
            MediaKind::Audio => sink.deliver_audio_data(data),
            MediaKind::Video => sink.deliver_video_data(data),
        };
    }

    fn update_state(&self, state: TransportState, transport: &dyn Transport) {
        if self.is_closed() {
            return;
        }
        info!(
            "update transport state {} to {state}",
            transport.transport_name()
        );

        // Listeners run after the lock is released: they may close the
        // connection, which joins reactors that could be waiting on it.
        let next = {
            let Ok(_guard) = self.state_lock.lock() else {
                error!("state lock poisoned");
                return;
            };
            if self.transports.is_empty() {
                return;
            }

            let current = self.current_state();
            let Some(next) = next_connection_state(
                current,
                state,
                self.transports.is_bundle_transport(transport),
                &self.transports.required_states(),
            ) else {
                return;
            };
            // close() stores Finished without the lock
            if self
                .state
                .compare_exchange(
                    current.into(),
                    next.into(),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_err()
            {
                return;
            }
            next
        };

        if next == ConnectionState::Failed {
            warn!("connection failed");
        } else if next == ConnectionState::Ready {
            info!("ready to send and receive media");
        }
        self.emit(next.into(), "");

        if next == ConnectionState::Started && get_slot(&self.event_listener).is_some() {
            match self.local_description() {
                Ok(sdp) => self.emit(ConnectionEvent::LocalDescriptionReady, &sdp),
                Err(err) => error!("failed to build local description: {err}"),
            }
        }
    }

    fn on_candidate(&self, candidate: &Candidate, transport: &dyn Transport) {
        if get_slot(&self.event_listener).is_none() {
            return;
        }

        let line = candidate.marshal();
        let mids = if self.is_bundle() {
            vec![MediaKind::Audio.mid(), MediaKind::Video.mid()]
        } else {
            vec![transport.transport_name()]
        };
        for mid in mids {
            match CandidateMessage::new(mid, &line).to_json() {
                Ok(json) => self.emit(ConnectionEvent::CandidateDiscovered, &json),
                Err(err) => error!("failed to encode candidate: {err}"),
            }
        }
    }
}

impl Drop for WebRtcConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// SSRC identifying the sender of an inbound packet: the sender SSRC of a
/// Sender Report, the RTP SSRC otherwise.
fn inbound_ssrc(data: &[u8]) -> Result<u32> {
    if data.len() > 1 && PacketType::from(data[1]) == PacketType::SenderReport {
        sender_ssrc(data)
    } else {
        rtp::header::ssrc(data)
    }
}

fn get_slot<T: ?Sized>(slot: &RwLock<Option<Arc<T>>>) -> Option<Arc<T>> {
    match slot.read() {
        Ok(value) => value.clone(),
        Err(err) => {
            error!("slot poisoned: {err}");
            None
        }
    }
}

fn set_slot<T: ?Sized>(slot: &RwLock<Option<Arc<T>>>, value: Option<Arc<T>>) {
    match slot.write() {
        Ok(mut current) => *current = value,
        Err(err) => error!("slot poisoned: {err}"),
    }
}
