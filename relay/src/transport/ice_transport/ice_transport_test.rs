use super::*;
use bytes::{Bytes, BytesMut};
use crossbeam_channel::{Receiver, Sender, unbounded};
use ice::candidate::NETWORK_UDP;
use ice::rand::generate_credentials;
use ice::{AgentCandidate, AgentConfig, AgentEvent, CandidateType, ComponentState, EventSender};
use std::net::SocketAddr;
use std::time::Duration;

use crate::configuration::RelayConfig;
use crate::connection::WebRtcConnection;
use crate::description::{LocalDescription, RemoteDescription, SdpWriter};
use crate::event::{ConnectionEvent, ConnectionEventListener};
use crate::state::ConnectionState;

const TIMEOUT: Duration = Duration::from_secs(5);

struct LoopbackAgent {
    credentials: (String, String),
    events: Mutex<Option<EventSender>>,
    local: Mutex<Vec<AgentCandidate>>,
    sent: Mutex<Vec<(u16, Vec<u8>)>>,
}

impl LoopbackAgent {
    fn new() -> Self {
        LoopbackAgent {
            credentials: generate_credentials(),
            events: Mutex::new(None),
            local: Mutex::new(vec![]),
            sent: Mutex::new(vec![]),
        }
    }

    fn post(&self, event: AgentEvent) {
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            events.send(event);
        }
    }

    fn sent(&self) -> Vec<(u16, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

impl IceAgent for LoopbackAgent {
    fn configure(&self, _config: &AgentConfig) -> Result<()> {
        Ok(())
    }

    fn add_stream(&self, _components: u16) -> Result<()> {
        Ok(())
    }

    fn local_credentials(&self) -> Result<(String, String)> {
        Ok(self.credentials.clone())
    }

    fn attach(&self, events: EventSender) {
        *self.events.lock().unwrap() = Some(events);
    }

    fn gather_candidates(&self) -> Result<()> {
        Ok(())
    }

    fn local_candidates(&self, _component: u16) -> Result<Vec<AgentCandidate>> {
        Ok(self.local.lock().unwrap().clone())
    }

    fn set_remote_candidates(&self, _component: u16, _candidates: &[Candidate]) -> Result<()> {
        Ok(())
    }

    fn send(&self, component: u16, data: &[u8]) -> Result<usize> {
        self.sent.lock().unwrap().push((component, data.to_vec()));
        Ok(data.len())
    }

    fn selected_pair(&self, _component: u16) -> Option<(SocketAddr, SocketAddr)> {
        None
    }

    fn close(&self) {}
}

/// Completes the handshake when the first handshake record arrives and
/// prefixes protected packets with a marker byte.
#[derive(Default)]
struct HandshakeOnRecord {
    link: Mutex<Option<HandshakeLink>>,
    fail_start: bool,
}

impl SecureChannel for HandshakeOnRecord {
    fn start(&self, link: HandshakeLink) -> Result<()> {
        if self.fail_start {
            return Err(Error::ErrSecureChannel("no certificate".to_owned()));
        }
        link.send(&[22, 254, 253])?;
        *self.link.lock().unwrap() = Some(link);
        Ok(())
    }

    fn handle_handshake(&self, _data: &[u8]) -> Result<()> {
        if let Some(link) = self.link.lock().unwrap().as_ref() {
            link.complete();
        }
        Ok(())
    }

    fn protect(&self, packet: &[u8]) -> Result<Bytes> {
        let mut out = vec![0xee];
        out.extend_from_slice(packet);
        Ok(Bytes::from(out))
    }

    fn unprotect(&self, packet: &[u8]) -> Result<BytesMut> {
        Ok(BytesMut::from(packet))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Observed {
    State(TransportState),
    Data(Vec<u8>),
    Candidate(String),
}

struct Recorder {
    tx: Sender<Observed>,
}

impl TransportListener for Recorder {
    fn on_transport_data(&self, data: &mut [u8], transport: &dyn Transport) {
        assert_eq!(transport.transport_name(), "video");
        let _ = self.tx.send(Observed::Data(data.to_vec()));
    }

    fn update_state(&self, state: TransportState, _transport: &dyn Transport) {
        let _ = self.tx.send(Observed::State(state));
    }

    fn on_candidate(&self, candidate: &Candidate, transport: &dyn Transport) {
        assert_eq!(candidate.transport_name, transport.transport_name());
        let _ = self.tx.send(Observed::Candidate(candidate.marshal()));
    }
}

struct Harness {
    transport: Arc<IceTransport>,
    agent: Arc<LoopbackAgent>,
    observed: Receiver<Observed>,
    _recorder: Arc<Recorder>,
}

fn harness(rtcp_mux: bool, channel: Arc<dyn SecureChannel>) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();

    let (tx, observed) = unbounded();
    let recorder = Arc::new(Recorder { tx });
    let listener: Weak<dyn TransportListener> = Arc::downgrade(&recorder) as _;
    let agent = Arc::new(LoopbackAgent::new());

    let transport = IceTransport::new(
        MediaKind::Video,
        rtcp_mux,
        agent.clone(),
        channel,
        &IceConfig::default(),
        listener,
    )
    .expect("transport");

    Harness {
        transport,
        agent,
        observed,
        _recorder: recorder,
    }
}

impl Harness {
    fn next(&self) -> Observed {
        self.observed.recv_timeout(TIMEOUT).expect("observation")
    }

    fn ready_components(&self, components: &[u16]) {
        for component in components {
            self.agent.post(AgentEvent::ComponentStateChanged {
                component: *component,
                state: ComponentState::Ready,
            });
        }
    }
}

#[test]
fn test_ice_transport_insecure_reaches_ready() -> Result<()> {
    let h = harness(true, Arc::new(InsecureChannel));
    assert_eq!(h.transport.state(), TransportState::Initial);
    assert_eq!(h.transport.ice_connection().map(|c| c.components()), Some(1));

    h.transport.start()?;
    assert_eq!(h.next(), Observed::State(TransportState::Started));

    h.ready_components(&[1]);
    assert_eq!(h.next(), Observed::State(TransportState::Ready));
    assert_eq!(h.transport.state(), TransportState::Ready);

    Ok(())
}

#[test]
fn test_ice_transport_write_requires_ready() -> Result<()> {
    let h = harness(false, Arc::new(HandshakeOnRecord::default()));
    let rtp = [0x80, 96, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1];
    let rtcp = [0x80, 200, 0, 1, 0, 0, 0, 1];

    assert_eq!(
        h.transport.write(&rtp),
        Err(Error::ErrTransportNotReady("video".to_owned()))
    );

    h.transport.start()?;
    assert_eq!(h.next(), Observed::State(TransportState::Started));
    h.ready_components(&[1, 2]);

    let deadline = std::time::Instant::now() + TIMEOUT;
    while h.agent.sent().is_empty() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(h.agent.sent(), vec![(1, vec![22, 254, 253])]);
    assert_eq!(h.transport.state(), TransportState::Started);

    h.agent.post(AgentEvent::Data {
        component: 1,
        data: Bytes::from_static(&[22, 254, 253, 0]),
    });
    assert_eq!(h.next(), Observed::State(TransportState::Ready));

    h.transport.write(&rtp)?;
    h.transport.write(&rtcp)?;

    let sent = h.agent.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[1].0, COMPONENT_RTP);
    assert_eq!(sent[1].1[0], 0xee, "media is protected");
    assert_eq!(&sent[1].1[1..], &rtp);
    assert_eq!(sent[2].0, COMPONENT_RTCP, "rtcp uses its own component");

    Ok(())
}

#[test]
fn test_ice_transport_media_after_ready() -> Result<()> {
    let h = harness(true, Arc::new(InsecureChannel));
    let rtp = Bytes::from_static(&[0x80, 96, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0xaa]);

    h.transport.start()?;
    assert_eq!(h.next(), Observed::State(TransportState::Started));

    h.agent.post(AgentEvent::Data {
        component: 1,
        data: rtp.clone(),
    });
    h.ready_components(&[1]);
    assert_eq!(
        h.next(),
        Observed::State(TransportState::Ready),
        "media before ready is dropped"
    );

    h.agent.post(AgentEvent::Data {
        component: 1,
        data: Bytes::from_static(&[0, 1, 0, 0]),
    });
    h.agent.post(AgentEvent::Data {
        component: 1,
        data: rtp.clone(),
    });
    assert_eq!(h.next(), Observed::Data(rtp.to_vec()));

    Ok(())
}

#[test]
fn test_ice_transport_failures_are_terminal() -> Result<()> {
    let tests = vec![
        (
            Arc::new(InsecureChannel) as Arc<dyn SecureChannel>,
            ComponentState::Failed,
        ),
        (
            Arc::new(HandshakeOnRecord {
                fail_start: true,
                ..Default::default()
            }) as Arc<dyn SecureChannel>,
            ComponentState::Ready,
        ),
    ];

    for (channel, component_state) in tests {
        let h = harness(true, channel);
        h.transport.start()?;
        assert_eq!(h.next(), Observed::State(TransportState::Started));

        h.agent.post(AgentEvent::ComponentStateChanged {
            component: 1,
            state: component_state,
        });
        assert_eq!(h.next(), Observed::State(TransportState::Failed));

        h.ready_components(&[1]);
        assert!(
            h.observed.recv_timeout(Duration::from_millis(100)).is_err(),
            "nothing follows failed"
        );
        assert_eq!(h.transport.state(), TransportState::Failed);
    }

    Ok(())
}

#[test]
fn test_ice_transport_forwards_candidates() -> Result<()> {
    let h = harness(true, Arc::new(InsecureChannel));
    let address: SocketAddr = "192.168.1.10:40000".parse().unwrap();
    h.agent.local.lock().unwrap().push(AgentCandidate {
        component: 1,
        foundation: "1".to_owned(),
        priority: 2013266431,
        candidate_type: CandidateType::Host,
        address,
        base_address: address,
    });

    h.transport.start()?;
    assert_eq!(h.next(), Observed::State(TransportState::Started));

    h.agent.post(AgentEvent::NewCandidate {
        component: 1,
        foundation: "1".to_owned(),
    });
    assert_eq!(
        h.next(),
        Observed::Candidate(format!(
            "candidate:1 1 {NETWORK_UDP} 2013266431 192.168.1.10 40000 typ host generation 0"
        ))
    );

    let local = h.transport.local_candidates();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].username, h.agent.credentials.0);
    assert_eq!(local[0].password, h.agent.credentials.1);
    assert_eq!(h.transport.local_credentials(), h.agent.credentials);

    h.transport.close();
    h.transport.close();
    assert!(h.transport.ice_connection().is_some_and(|c| c.is_closed()));

    Ok(())
}

struct EmptySdp;

impl SdpWriter for EmptySdp {
    fn write(&self, _description: &LocalDescription) -> Result<String> {
        Ok(String::new())
    }
}

/// Wakes the audio reactor with a candidate, then closes the connection
/// from inside the Failed notification.
struct CloseOnFailed {
    conn: Mutex<Weak<WebRtcConnection>>,
    audio: Arc<LoopbackAgent>,
    closed: Sender<ConnectionState>,
}

impl ConnectionEventListener for CloseOnFailed {
    fn notify_event(&self, event: ConnectionEvent, _message: &str) {
        if event != ConnectionEvent::Failed {
            return;
        }
        self.audio.post(AgentEvent::NewCandidate {
            component: 1,
            foundation: "1".to_owned(),
        });

        let conn = self.conn.lock().unwrap().upgrade();
        if let Some(conn) = conn {
            conn.close();
            let _ = self.closed.send(conn.current_state());
        }
    }
}

#[test]
fn test_connection_close_from_failed_listener() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let audio = Arc::new(LoopbackAgent::new());
    let video = Arc::new(LoopbackAgent::new());
    let address: SocketAddr = "192.168.1.10:40000".parse().unwrap();
    audio.local.lock().unwrap().push(AgentCandidate {
        component: 1,
        foundation: "1".to_owned(),
        priority: 2013266431,
        candidate_type: CandidateType::Host,
        address,
        base_address: address,
    });

    let agents = (audio.clone(), video.clone());
    let factory = IceTransportFactory::insecure(IceConfig::default(), move |media_kind| {
        Ok(match media_kind {
            MediaKind::Audio => agents.0.clone() as Arc<dyn IceAgent>,
            MediaKind::Video => agents.1.clone() as Arc<dyn IceAgent>,
        })
    });
    let conn = WebRtcConnection::new(
        RelayConfig::default(),
        Arc::new(factory),
        Arc::new(EmptySdp),
    )?;

    let (tx, closed) = unbounded();
    conn.set_event_listener(Some(Arc::new(CloseOnFailed {
        conn: Mutex::new(Arc::downgrade(&conn)),
        audio: audio.clone(),
        closed: tx,
    })));
    conn.set_remote_description(RemoteDescription {
        has_audio: true,
        has_video: true,
        rtcp_mux: true,
        ..Default::default()
    })?;

    video.post(AgentEvent::ComponentStateChanged {
        component: 1,
        state: ComponentState::Failed,
    });

    assert_eq!(
        closed.recv_timeout(TIMEOUT).expect("close returned"),
        ConnectionState::Finished
    );
    assert!(conn.is_closed());

    Ok(())
}
