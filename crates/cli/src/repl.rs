//! Line-oriented loop driving a form session from stdin.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use supplyid_infra::{BusinessRegistry, FormSession, LookupResult, SupplierStore};

use crate::command::{Command, HELP};

pub struct Repl<S, R> {
    session: FormSession<S, R>,
    registry: Arc<dyn BusinessRegistry>,
}

impl<S, R> Repl<S, R>
where
    S: SupplierStore + Clone + 'static,
    R: BusinessRegistry + 'static,
{
    pub fn new(session: FormSession<S, R>, registry: Arc<dyn BusinessRegistry>) -> Self {
        Self { session, registry }
    }

    pub async fn run(&self) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("{HELP}");
        loop {
            stdout.write_all(b"supplyid> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            match Command::parse(&line) {
                Ok(None) => {}
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => {
                    if let Err(e) = self.execute(command).await {
                        eprintln!("error: {e:#}");
                    }
                }
                Err(e) => eprintln!("error: {e:#}"),
            }
        }
        Ok(())
    }

    async fn execute(&self, command: Command) -> Result<()> {
        debug!(?command, "executing");
        match command {
            Command::Set { field, value } => {
                self.session.on_input_change(field, &value)?;
                self.show()?;
            }
            Command::Origin(origin) => {
                self.session.on_origin_toggle(origin)?;
                self.show()?;
            }
            Command::Search(raw) => {
                match self.session.search_now(&raw).await {
                    LookupResult::LocalMatches(found) => {
                        println!("{} local match(es); use `select <id>` to edit one", found.len());
                    }
                    LookupResult::RegistryMatch(payload) => {
                        println!("registry: {} {}", payload.tax_id, payload.legal_name);
                    }
                    LookupResult::NotFound | LookupResult::Failed(_) => {}
                }
                self.show()?;
            }
            Command::Select(id) => {
                self.session.select_match(id)?;
                self.show()?;
            }
            Command::Submit => {
                let outcome = self.session.on_submit().await;
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            Command::Active(active) => {
                let outcome = self.session.set_active(active).await;
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            Command::Show => self.show()?,
            Command::Cancel => {
                self.session.cancel();
                self.show()?;
            }
            Command::RegistryRefresh => {
                let at = self.registry.refresh().await?;
                println!("registry refreshed at {at}");
            }
            Command::RegistryStatus => match self.registry.last_refreshed_at().await? {
                Some(at) => println!("registry last refreshed at {at}"),
                None => println!("registry never refreshed"),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
        Ok(())
    }

    fn show(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&self.session.snapshot())?);
        Ok(())
    }
}
