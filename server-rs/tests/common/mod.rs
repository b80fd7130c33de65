use poule_server::*;
use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;
use tungstenite::client::AutoStream;
use tungstenite::error::UrlError::UnableToConnect;
use tungstenite::{connect, Message, WebSocket};
use url::Url;

// sqlite database test helper
// every session gets its own database file, removed once done
struct SqliteTestContext {
    path: PathBuf,
}

impl SqliteTestContext {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("{}.db", name));
        // leftover from an aborted run
        let _ = fs::remove_file(&path);
        SqliteTestContext { path }
    }

    fn url(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

impl Drop for SqliteTestContext {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SessionTestLine {
    Client { id: usize, cmd: String },
    Server { id: usize, cmd: String },
}

/// Parse a session test case.
/// Return (lines, number of client/server connections)
fn parse_session_test(test: &str) -> Result<(Vec<SessionTestLine>, usize), String> {
    let mut lines = Vec::new();
    let mut max_id = 0;
    for line in test.lines().map(str::trim) {
        // skip blank and comment lines
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let chars: Vec<char> = line.chars().take(4).collect();
        let (sender, id) = match chars[..] {
            ['[', sender, id, ']'] => (sender, id),
            _ => {
                return Err(format!(
                    "invalid test line: {}: line does not begin with sender tag",
                    line
                ))
            }
        };
        let id = id.to_digit(10).ok_or_else(|| {
            format!(
                "invalid test line: {}: sender tag should contain a connection id, contains {} instead",
                line, id
            )
        })? as usize;
        let cmd = line[4..].trim().to_string();
        lines.push(match sender {
            'C' => SessionTestLine::Client { id, cmd },
            'S' => SessionTestLine::Server { id, cmd },
            _ => {
                return Err(format!(
                    "invalid test line: {}: sender tag should begin with C or S, not {}",
                    line, sender
                ))
            }
        });
        max_id = max_id.max(id);
    }

    Ok((lines, max_id))
}

/// Check if a server response matches an expected format.
/// The comparison is literal, except that a * in the expected format matches one value: a run of
/// characters without whitespace, commas or brackets.
fn response_matches_expected(response: &str, expect: &str) -> bool {
    let globable = |c: &char| !c.is_whitespace() && !matches!(c, ',' | '[' | ']');

    let mut resp = response.chars().peekable();
    for e in expect.chars() {
        if e == '*' {
            if resp.next_if(globable).is_none() {
                return false;
            }
            while resp.next_if(globable).is_some() {}
        } else if resp.next() != Some(e) {
            return false;
        }
    }

    resp.next().is_none()
}

/// Run a session test case.
/// A session test case is a list of client commands to send, and expected responses from the server.
/// Multiple client/server connections are supported in a test case. Each line of the test case starts with its sender (in brackets), then contains the command to send to/expect from the server. Clients are C1, C2, C3, etc, and server responses are S1, S2, S3, etc.
/// For example,
/// > [C2] observe_tournament 1
/// > [S2] rounds 1, ...
/// > [C1] score 3, 21, 15, 21, 18
/// > [S1] okay
/// > [S2] rounds 1, ...
pub async fn session_test(test: &str) {
    // find an open port
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let port = addr.port();
    drop(listener);

    let db_ctx = SqliteTestContext::new(&format!("poule_server_test_{}", port));
    let db_url = db_ctx.url();

    // start the server
    tokio::spawn(async move {
        if let Err(e) = server::run_server(&format!("127.0.0.1:{}", port), &db_url).await {
            panic!("test server failed: {}", e);
        }
    });

    let ws_url = format!("ws://127.0.0.1:{}", port);

    // wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    while let Err(tungstenite::Error::Url(UnableToConnect(_))) =
        connect(Url::parse(&ws_url).expect("couldn't parse server url"))
    {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // parse the test case
    let (lines, num_clients) = parse_session_test(test).expect("failed to parse session test case");

    // open connections to server
    let mut conns: Vec<WebSocket<AutoStream>> = (0..num_clients)
        .map(|_| {
            connect(Url::parse(&ws_url).expect("couldn't parse server url"))
                .expect("couldn't connect to server")
                .0
        })
        .collect();

    for line in &lines {
        match line {
            SessionTestLine::Client { id, cmd } => {
                conns[*id - 1]
                    .write_message(Message::Text(cmd.clone()))
                    .expect("can't send message to server");
            }
            SessionTestLine::Server { id, cmd } => {
                let response = conns[*id - 1]
                    .read_message()
                    .expect("error reading message from server")
                    .into_text()
                    .expect("response isn't text");
                if !response_matches_expected(&response, cmd) {
                    panic!("response from server doesn't match expected:\nresponse: [S{}] {}\nexpected: [S{}] {}", *id, response, *id, cmd);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_test() {
        assert_eq!(
            parse_session_test("[C1] cmd1\n[S1] cmd2 arg1\n[C2] cmd3"),
            Ok((
                vec![
                    SessionTestLine::Client {
                        id: 1,
                        cmd: "cmd1".to_string()
                    },
                    SessionTestLine::Server {
                        id: 1,
                        cmd: "cmd2 arg1".to_string()
                    },
                    SessionTestLine::Client {
                        id: 2,
                        cmd: "cmd3".to_string()
                    }
                ],
                2
            ))
        );
        assert!(parse_session_test("// comment\n\n[X1] cmd").is_err());
        assert!(parse_session_test("C1 cmd").is_err());
    }

    #[test]
    fn glob_test() {
        assert!(response_matches_expected("new_team 12", "new_team *"));
        assert!(response_matches_expected(
            "rounds 1, [[3, 1, group, 09:00, 09:20, []]]",
            "rounds 1, [[*, 1, group, *, *, []]]"
        ));
        assert!(!response_matches_expected("rounds 1, []", "rounds *, [*]"));
        assert!(!response_matches_expected("okay then", "okay"));
        assert!(!response_matches_expected("error", "error *"));
    }
}
