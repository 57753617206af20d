use askdb_stream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    askdb_stream::observability::init_observability("info");
    let client = QueryClient::from_env()?;

    let mut updates = client.subscribe();
    let mut handle = client.submit("近30天销售趋势");

    loop {
        tokio::select! {
            _ = &mut handle => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                println!("{} (thinking: {} chars)", snapshot.state, snapshot.thinking.chars().count());
            }
        }
    }

    let snapshot = client.snapshot();
    match snapshot.state {
        QueryState::Error => {
            if let Some(error) = snapshot.error {
                eprintln!("query failed: {error}");
            }
        }
        _ => println!("{}", snapshot.sql.unwrap_or_default()),
    }
    Ok(())
}
