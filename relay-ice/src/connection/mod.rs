
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info, trace, warn};
use shared::MediaKind;
use shared::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};

use crate::agent::agent_config::{AgentConfig, IceConfig};
use crate::agent::{AgentEvent, ComponentState, EventSender, IceAgent, ReactorMessage};
use crate::candidate::{COMPONENT_RTP, Candidate};
use crate::state::IceState;

/// Receives everything an `IceConnection` observes. Callbacks run on the
/// reactor thread, except state changes caused by an application call which
/// run on the caller's thread.
pub trait IceConnectionListener: Send + Sync {
    fn on_ice_data(&self, component: u16, data: &[u8], source: &IceConnection);
    fn on_candidate(&self, candidate: &Candidate, source: &IceConnection);
    fn on_ice_state_change(&self, state: IceState, source: &IceConnection);
}

/// Drives one ICE agent for one media stream: starts gathering, surfaces
/// local candidates, aggregates per-component readiness and gates sends on
/// the stream being Ready.
pub struct IceConnection {
    media_kind: MediaKind,
    transport_name: String,
    components: u16,

    agent: Arc<dyn IceAgent>,
    listener: Weak<dyn IceConnectionListener>,

    ufrag: String,
    pwd: String,

    state: AtomicU8,
    component_states: Mutex<HashMap<u16, IceState>>,
    local_candidates: Mutex<Vec<Candidate>>,

    write_lock: Mutex<()>,
    mailbox: Sender<ReactorMessage>,
    inbox: Mutex<Option<Receiver<ReactorMessage>>>,
    reactor: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,

    weak_self: Weak<IceConnection>,
}

impl IceConnection {
    /// Configures `agent` and creates its stream. Nothing runs until `start`.
    pub fn new(
        media_kind: MediaKind,
        transport_name: &str,
        components: u16,
        agent: Arc<dyn IceAgent>,
        config: &IceConfig,
        listener: Weak<dyn IceConnectionListener>,
    ) -> Result<Arc<Self>> {
        let agent_config = AgentConfig::from(config);
        if let Some((host, port)) = &agent_config.stun_server {
            debug!("{transport_name} - setting STUN server {host}:{port}");
        }
        if let Some((min_port, max_port)) = agent_config.port_range {
            debug!("{transport_name} - setting port range: {min_port} to {max_port}");
        }
        agent.configure(&agent_config)?;

        debug!("{transport_name} - adding stream with {components} components");
        agent.add_stream(components)?;
        let (ufrag, pwd) = agent.local_credentials()?;

        let (mailbox, inbox) = unbounded();
        agent.attach(EventSender::new(mailbox.clone()));

        let component_states = (1..=components)
            .map(|component| (component, IceState::Initial))
            .collect();

        Ok(Arc::new_cyclic(|weak_self| IceConnection {
            media_kind,
            transport_name: transport_name.to_owned(),
            components,
            agent,
            listener,
            ufrag,
            pwd,
            state: AtomicU8::new(IceState::Initial.into()),
            component_states: Mutex::new(component_states),
            local_candidates: Mutex::new(vec![]),
            write_lock: Mutex::new(()),
            mailbox,
            inbox: Mutex::new(Some(inbox)),
            reactor: Mutex::new(None),
            closed: AtomicBool::new(false),
            weak_self: weak_self.clone(),
        }))
    }

    /// Launches the reactor thread. Only the first call has an effect.
    pub fn start(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ErrAgentClosed);
        }

        let Some(inbox) = self.inbox.lock()?.take() else {
            warn!("{} - ICE connection already started", self.transport_name);
            return Ok(());
        };

        let conn = self.weak_self.clone();
        let handle = thread::Builder::new()
            .name(format!("ice-{}", self.transport_name))
            .spawn(move || run_reactor(conn, inbox))?;
        *self.reactor.lock()? = Some(handle);

        Ok(())
    }

    /// Sends `data` on `component` once every component is Ready.
    pub fn send_data(&self, component: u16, data: &[u8]) -> Result<usize> {
        let _guard = self.write_lock.lock()?;
        if self.state() != IceState::Ready {
            return Err(Error::ErrIceNotReady);
        }

        let n = self.agent.send(component, data)?;
        if n != data.len() {
            debug!("data sent {} of {}", n, data.len());
        }
        Ok(n)
    }

    /// Installs remote candidates, one bulk call per component.
    pub fn set_remote_candidates(&self, candidates: &[Candidate]) -> Result<()> {
        let mut by_component: BTreeMap<u16, Vec<Candidate>> = BTreeMap::new();
        for candidate in candidates {
            if candidate.component == 0 || candidate.component > self.components {
                warn!(
                    "{} - ignoring remote candidate for component {}",
                    self.transport_name, candidate.component
                );
                continue;
            }
            debug!(
                "{} - adding remote candidate {} priority {} component {}",
                self.transport_name, candidate, candidate.priority, candidate.component
            );
            by_component
                .entry(candidate.component)
                .or_default()
                .push(candidate.clone());
        }

        for (component, list) in &by_component {
            self.agent.set_remote_candidates(*component, list)?;
        }

        self.update_ice_state(IceState::CandidatesReceived);
        Ok(())
    }

    pub fn local_credentials(&self) -> (String, String) {
        (self.ufrag.clone(), self.pwd.clone())
    }

    /// Snapshot of the local candidates surfaced so far.
    pub fn local_candidates(&self) -> Vec<Candidate> {
        match self.local_candidates.lock() {
            Ok(candidates) => candidates.clone(),
            Err(err) => {
                error!("local candidates: {err}");
                vec![]
            }
        }
    }

    pub fn state(&self) -> IceState {
        IceState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    pub fn transport_name(&self) -> &str {
        &self.transport_name
    }

    pub fn components(&self) -> u16 {
        self.components
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops the reactor, waits for it, then releases the agent.
    /// Subsequent calls do nothing.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("{} - closing ICE connection", self.transport_name);

        let _ = self.mailbox.send(ReactorMessage::Shutdown);

        let handle = match self.reactor.lock() {
            Ok(mut reactor) => reactor.take(),
            Err(err) => {
                error!("ICE reactor handle: {err}");
                None
            }
        };
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                trace!("{} - closed from the reactor thread", self.transport_name);
            } else if handle.join().is_err() {
                error!("{} - ICE reactor panicked", self.transport_name);
            }
        }

        self.agent.close();
        self.state.store(IceState::Finished.into(), Ordering::SeqCst);
    }

    fn begin_gathering(&self) {
        self.update_ice_state(IceState::Initial);

        debug!("{} - gathering candidates", self.transport_name);
        if let Err(err) = self.agent.gather_candidates() {
            error!("{} - failed to gather candidates: {err}", self.transport_name);
            self.update_ice_state(IceState::Failed);
        }
    }

    fn handle_agent_event(&self, event: AgentEvent) {
        if self.is_closed() {
            return;
        }

        match event {
            AgentEvent::NewCandidate {
                component,
                foundation,
            } => self.on_new_candidate(component, &foundation),
            AgentEvent::GatheringDone => {
                debug!("{} - candidate gathering done", self.transport_name);
            }
            AgentEvent::ComponentStateChanged { component, state } => match state {
                ComponentState::Ready => self.update_component_state(component, IceState::Ready),
                ComponentState::Failed => {
                    warn!("{} - component {component} failed", self.transport_name);
                    self.update_ice_state(IceState::Failed);
                }
                _ => trace!(
                    "{} - component {component} is {state}",
                    self.transport_name
                ),
            },
            AgentEvent::NewSelectedPair { component } => {
                self.update_component_state(component, IceState::Ready)
            }
            AgentEvent::Data { component, data } => {
                if let Some(listener) = self.listener.upgrade() {
                    listener.on_ice_data(component, &data, self);
                }
            }
        }
    }

    fn on_new_candidate(&self, component: u16, foundation: &str) {
        let discovered = match self.agent.local_candidates(component) {
            Ok(discovered) => discovered,
            Err(err) => {
                error!(
                    "{} - failed to read local candidates: {err}",
                    self.transport_name
                );
                return;
            }
        };

        let listener = self.listener.upgrade();
        for c in discovered
            .iter()
            .filter(|c| c.component == component && c.foundation == foundation)
        {
            let Some(candidate) = Candidate::from_agent(
                c,
                (self.ufrag.as_str(), self.pwd.as_str()),
                &self.transport_name,
                self.media_kind,
            ) else {
                continue;
            };

            if let Ok(mut local_candidates) = self.local_candidates.lock() {
                local_candidates.push(candidate.clone());
            }
            if let Some(listener) = &listener {
                listener.on_candidate(&candidate, self);
            }
        }
        info!("{} - new local candidate", self.transport_name);

        self.update_ice_state(IceState::CandidatesGathered);
    }

    fn update_component_state(&self, component: u16, state: IceState) {
        debug!(
            "{} - component {component} state changed to {state}",
            self.transport_name
        );

        let all_ready = {
            let Ok(mut states) = self.component_states.lock() else {
                error!("{} - component states poisoned", self.transport_name);
                return;
            };
            if !states.contains_key(&component) {
                warn!(
                    "{} - {}",
                    self.transport_name,
                    Error::ErrNoSuchComponent(component)
                );
                return;
            }
            states.insert(component, state);
            states.values().all(|s| *s == IceState::Ready)
        };

        if state == IceState::Ready && !all_ready {
            return;
        }
        self.update_ice_state(state);
    }

    fn update_ice_state(&self, state: IceState) {
        debug!("{} - ICE state changed to {state}", self.transport_name);
        self.state.store(state.into(), Ordering::SeqCst);

        if state == IceState::Ready {
            if let Some((local, remote)) = self.agent.selected_pair(COMPONENT_RTP) {
                debug!(
                    "{} - selected pair: local candidate addr {local}, remote candidate addr {remote}",
                    self.transport_name
                );
            }
        }

        if let Some(listener) = self.listener.upgrade() {
            listener.on_ice_state_change(state, self);
        }
    }
}

impl Drop for IceConnection {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_reactor(conn: Weak<IceConnection>, inbox: Receiver<ReactorMessage>) {
    match conn.upgrade() {
        Some(c) => c.begin_gathering(),
        None => return,
    }

    while let Ok(message) = inbox.recv() {
        match message {
            ReactorMessage::Shutdown => break,
            ReactorMessage::Agent(event) => match conn.upgrade() {
                Some(c) => c.handle_agent_event(event),
                None => break,
            },
        }
    }

    trace!("ICE reactor exited");
}
