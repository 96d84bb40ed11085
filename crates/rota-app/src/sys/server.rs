use crate::events::AppEvent;
use async_channel::Sender;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;

pub const SOCKET_PATH: &str = "/tmp/rota.sock";

/// Maps one line of the control protocol to an event.
pub fn parse_command(line: &str) -> Option<AppEvent> {
    let mut words = line.split_whitespace();
    let event = match (words.next()?, words.next()) {
        ("toggle", None) => AppEvent::Toggle,
        ("pause", None) => AppEvent::Pause,
        ("resume", None) => AppEvent::Resume,
        ("reload", None) => AppEvent::SlicesReload,
        ("select", Some(index)) => AppEvent::Select(index.parse().ok()?),
        _ => return None,
    };
    words.next().is_none().then_some(event)
}

pub async fn run_server(tx: Sender<AppEvent>) {
    // Cleanup old socket if it exists
    if fs_err::metadata(SOCKET_PATH).is_ok() {
        let _ = fs_err::remove_file(SOCKET_PATH);
    }

    let listener = match UnixListener::bind(SOCKET_PATH) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind unix socket: {}", e);
            return;
        }
    };

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let reader = BufReader::new(&mut stream);
                    let mut lines = reader.lines();

                    while let Ok(Some(line)) = lines.next_line().await {
                        match parse_command(&line) {
                            Some(event) => {
                                let _ = tx.send(event).await;
                            }
                            None => log::warn!("Unknown command: {}", line.trim()),
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cases = vec![
            ("toggle", Some(AppEvent::Toggle)),
            ("  pause\n", Some(AppEvent::Pause)),
            ("resume", Some(AppEvent::Resume)),
            ("reload", Some(AppEvent::SlicesReload)),
            ("select 3", Some(AppEvent::Select(3))),
            ("select", None),
            ("select -1", None),
            ("select 1 2", None),
            ("toggle now", None),
            ("", None),
            ("show", None),
        ];

        for (line, expected) in cases {
            assert_eq!(parse_command(line), expected, "line {:?}", line);
        }
    }

    #[tokio::test]
    async fn test_server_forwards_commands() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::UnixStream;

        let (tx, rx) = async_channel::unbounded();
        tokio::spawn(run_server(tx));

        let mut stream = loop {
            match UnixStream::connect(SOCKET_PATH).await {
                Ok(s) => break s,
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
            }
        };
        stream.write_all(b"bogus\nselect 2\ntoggle\n").await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), AppEvent::Select(2));
        assert_eq!(rx.recv().await.unwrap(), AppEvent::Toggle);
    }
}
