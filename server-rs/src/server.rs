use crate::cmd::{ClientCommand, ServerCommand};
use crate::db::{init_db_pool, DBWrapper, SqlitePool};
use crate::error::Error;
use crate::models::{self, Tournament, TournamentId};
use crate::progression::overall_standings;
use crate::standings::poule_standings;
use crate::tournament;
use futures_channel::mpsc;
use futures_util::{future, pin_mut, stream::TryStreamExt, StreamExt};
use log::{debug, error, info, warn};
use std::{
    collections::HashMap,
    collections::HashSet,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::net::{TcpListener, TcpStream};
use tungstenite::protocol::Message;

/// Topics that a client is interested in receiving messages about
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
enum Topic {
    /// Schedule updates for a particular tournament
    Tournament(TournamentId),
}

type ClientTxChannel = mpsc::UnboundedSender<Message>;

/// A collection of connected clients, with the topics each one observes
#[derive(Debug, Default)]
struct ClientMap {
    // map client -> client transmit channel
    channels: HashMap<SocketAddr, ClientTxChannel>,
    // map topic -> interested clients
    topics: HashMap<Topic, HashSet<SocketAddr>>,
}

type ClientMapLock = Arc<Mutex<ClientMap>>;

impl ClientMap {
    /// Insert a client connection
    pub fn insert_client(&mut self, client: SocketAddr, tx: ClientTxChannel) {
        self.channels.insert(client, tx);
    }

    /// Add a client to a topic, creating that topic if it doesn't exist.
    pub fn add_to_topic(&mut self, topic: Topic, client: SocketAddr) {
        self.topics.entry(topic).or_default().insert(client);
    }

    /// Remove a client from a topic (if the client is in that topic)
    pub fn remove_from_topic(&mut self, topic: Topic, client: &SocketAddr) {
        if let Some(topic_map) = self.topics.get_mut(&topic) {
            topic_map.remove(client);
        }
    }

    /// Remove a client connection
    pub fn remove_client(&mut self, client: &SocketAddr) {
        self.channels.remove(client);
        for topic in self.topics.values_mut() {
            topic.remove(client);
        }
    }

    /// Send a message to a client
    pub fn send(&self, client: &SocketAddr, msg: Message) -> Result<(), Error> {
        match self.channels.get(client) {
            Some(tx) => {
                tx.unbounded_send(msg).unwrap_or_else(|e| {
                    warn!(
                        "can't send message to client {}, receiving channel was closed: {}",
                        client, e
                    )
                });
                Ok(())
            }
            None => Err(Error::NoSuchConnectedClient),
        }
    }

    /// Send a message to all clients in a topic
    pub fn publish(&self, topic: Topic, msg: &Message) -> Result<(), Error> {
        if let Some(topic_map) = self.topics.get(&topic) {
            for client in topic_map {
                self.send(client, msg.clone())?;
            }
        }

        Ok(())
    }
}

/// Lock the client map. A panic elsewhere while holding the lock doesn't leave the map inconsistent.
fn lock(client_map: &Mutex<ClientMap>) -> MutexGuard<'_, ClientMap> {
    client_map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Send a tournament's current schedule to its observers
fn publish_schedule(id: TournamentId, db: &mut DBWrapper, client_map: &Mutex<ClientMap>) {
    let cmd = match db.find_schedule(id) {
        Ok(rounds) => ServerCommand::Rounds { id, rounds },
        Err(e) => {
            warn!("can't load schedule of tournament {} for observers: {}", id, e);
            return;
        }
    };
    lock(client_map)
        .publish(Topic::Tournament(id), &Message::from(cmd.to_string()))
        .unwrap_or_else(|e| warn!("can't send schedule to tournament observers: {}", e));
}

/// Apply a command sent by a client and return a response (if necessary)
fn handle_cmd(
    cmd: &ClientCommand,
    client_map: &Mutex<ClientMap>,
    client_addr: &SocketAddr,
    db_pool: &SqlitePool,
) -> Result<Option<ServerCommand>, Error> {
    use ClientCommand::*;

    let mut conn = db_pool.get()?;
    let db = &mut DBWrapper::new(&mut conn);

    match cmd {
        NewTournament {
            name,
            start_time,
            num_fields,
            match_duration_minutes,
            break_duration_minutes,
        } => {
            let tourney = db.new_tournament(models::NewTournament {
                name: *name,
                start_time: *start_time,
                num_fields: *num_fields,
                match_duration_minutes: *match_duration_minutes,
                break_duration_minutes: *break_duration_minutes,
            })?;
            info!("created tournament {} ({})", tourney.id, tourney.name);
            Ok(Some(ServerCommand::NewTournament(tourney.id)))
        }
        Tournaments => Ok(Some(ServerCommand::Tournaments(db.find_tournaments()?))),
        UpdateTournament {
            id,
            name,
            start_time,
            num_fields,
            match_duration_minutes,
            break_duration_minutes,
        } => {
            db.save_tournament(&Tournament {
                id: *id,
                name: name.to_string(),
                start_time: *start_time,
                num_fields: *num_fields,
                match_duration_minutes: *match_duration_minutes,
                break_duration_minutes: *break_duration_minutes,
            })?;
            Ok(None)
        }
        DeleteTournament(id) => {
            db.delete_tournament(*id)?;
            info!("deleted tournament {}", id);
            Ok(None)
        }
        NewPoule { tournament, name } => {
            let poule = db.new_poule(*tournament, name)?;
            Ok(Some(ServerCommand::NewPoule(poule.id)))
        }
        Poules(id) => {
            db.find_tournament(*id)?;
            Ok(Some(ServerCommand::Poules(db.find_poules(*id)?)))
        }
        RenamePoule { id, name } => {
            db.rename_poule(*id, name)?;
            Ok(None)
        }
        DeletePoule(id) => {
            db.delete_poule(*id)?;
            Ok(None)
        }
        NewTeam {
            tournament,
            name,
            poule,
        } => {
            let team = db.new_team(*tournament, name, *poule)?;
            Ok(Some(ServerCommand::NewTeam(team.id)))
        }
        Teams(id) => {
            db.find_tournament(*id)?;
            Ok(Some(ServerCommand::Teams(db.find_teams(*id)?)))
        }
        RenameTeam { id, name } => {
            db.rename_team(*id, name)?;
            Ok(None)
        }
        AssignTeam { id, poule } => {
            db.assign_team(*id, *poule)?;
            Ok(None)
        }
        DeleteTeam(id) => {
            db.delete_team(*id)?;
            Ok(None)
        }
        GenerateGroupPhase(id) => {
            tournament::generate_group_phase(db, *id)?;
            publish_schedule(*id, db, client_map);
            Ok(None)
        }
        GenerateKnockoutPhase(id) => {
            tournament::generate_knockout_phase(db, *id)?;
            publish_schedule(*id, db, client_map);
            Ok(None)
        }
        GenerateFinal(id) => {
            tournament::generate_final(db, *id)?;
            publish_schedule(*id, db, client_map);
            Ok(None)
        }
        TeamByRank { poule, rank } => Ok(Some(ServerCommand::Team(tournament::team_by_rank(
            db, *poule, *rank,
        )?))),
        Rounds(id) => Ok(Some(ServerCommand::Rounds {
            id: *id,
            rounds: db.find_schedule(*id)?,
        })),
        Score { id, sets } => {
            let m = db.submit_score(*id, *sets)?;
            debug!("scores of match {} set to {:?}", m.id, m.sets);
            publish_schedule(m.tournament_id, db, client_map);
            Ok(None)
        }
        Standings(id) => Ok(Some(ServerCommand::Standings {
            id: *id,
            poules: poule_standings(db, *id)?,
        })),
        OverallStandings(id) => Ok(Some(ServerCommand::OverallStandings {
            id: *id,
            entries: overall_standings(db, *id)?,
        })),
        PhaseStatus(id) => Ok(Some(ServerCommand::PhaseStatus {
            id: *id,
            status: tournament::phase_status(db, *id)?,
        })),
        ObserveTournament(id) => {
            let rounds = db.find_schedule(*id)?;
            lock(client_map).add_to_topic(Topic::Tournament(*id), *client_addr);
            Ok(Some(ServerCommand::Rounds { id: *id, rounds }))
        }
        StopObserveTournament(id) => {
            lock(client_map).remove_from_topic(Topic::Tournament(*id), client_addr);
            Ok(None)
        }
    }
}

/// Parse a message sent by a client, perform the necessary action, and send the response back
fn handle_message(
    msg: &Message,
    client_map: &Mutex<ClientMap>,
    client_addr: &SocketAddr,
    db_pool: &SqlitePool,
) {
    // nothing to reply to close and ping messages
    if msg.is_close() || msg.is_ping() || msg.is_pong() {
        return;
    }
    let reply = match msg.to_text() {
        Err(_) => Err(Error::MessageParseError),
        Ok(txt) => {
            debug!("{}: {}", client_addr, txt);
            ClientCommand::deserialize(txt)
                .and_then(|cmd| handle_cmd(&cmd, client_map, client_addr, db_pool))
        }
    };

    let reply = match reply {
        Ok(Some(cmd)) => cmd,
        Ok(None) => ServerCommand::Okay,
        Err(e) => {
            debug!("{}: rejected: {}", client_addr, e);
            ServerCommand::Error(e)
        }
    };

    lock(client_map)
        .send(client_addr, Message::from(reply.to_string()))
        .unwrap_or_else(|e| warn!("error sending message to client {}: {}", client_addr, e));
}

async fn handle_connection(
    client_map: ClientMapLock,
    raw_stream: TcpStream,
    addr: SocketAddr,
    db_pool: Arc<SqlitePool>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(raw_stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("websocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    debug!("client {} connected", addr);

    // create channel for sending messages to websocket
    let (tx, rx) = mpsc::unbounded();
    lock(&client_map).insert_client(addr, tx);

    let (outgoing, incoming) = ws_stream.split();

    let handle_incoming = incoming.try_for_each(|msg| {
        handle_message(&msg, &client_map, &addr, &db_pool);
        future::ok(())
    });

    let send_outgoing = rx.map(Ok).forward(outgoing);

    pin_mut!(handle_incoming, send_outgoing);
    future::select(handle_incoming, send_outgoing).await;

    lock(&client_map).remove_client(&addr);
    debug!("client {} disconnected", addr);
}

/// Serve the websocket protocol on `url`, storing tournaments in the sqlite database at `db_url`
pub async fn run_server(url: &str, db_url: &str) -> Result<(), Error> {
    // Create application state
    let clients = Arc::new(Mutex::new(ClientMap::default()));
    let db_pool = Arc::new(init_db_pool(db_url)?);

    // Setup a tcp server and accept connections
    let listener = TcpListener::bind(url).await?;
    info!("listening on: {}", url);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_connection(
                    clients.clone(),
                    stream,
                    addr,
                    db_pool.clone(),
                ));
            }
            Err(e) => error!("failed to accept connection: {}", e),
        }
    }
}
