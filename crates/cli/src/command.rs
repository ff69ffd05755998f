//! Interactive commands typed at the `supplyid>` prompt.

use anyhow::{bail, Context, Result};

use supplyid_core::SupplierId;
use supplyid_suppliers::{Field, Origin};

pub const HELP: &str = "\
commands:
  set <field> <value>        edit a field (tax_id, legal_name, address, phone,
                             email, representative, contact_person)
  origin <domestic|foreign>  switch the supplier origin
  search <tax id or name>    look up right away
  select <id>                edit one of the local matches
  submit                     validate and save
  active <true|false>        activate or deactivate
  show                       print the form
  cancel                     discard edits and pending lookups
  registry refresh|status    reload registry data / show last reload
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { field: Field, value: String },
    Origin(Origin),
    Search(String),
    Select(SupplierId),
    Submit,
    Active(bool),
    Show,
    Cancel,
    RegistryRefresh,
    RegistryStatus,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match verb.to_lowercase().as_str() {
            "set" => {
                let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                if field.is_empty() {
                    bail!("usage: set <field> <value>");
                }
                Command::Set {
                    field: field.parse()?,
                    value: value.trim().to_string(),
                }
            }
            "origin" => Command::Origin(rest.parse()?),
            "search" => Command::Search(rest.to_string()),
            "select" => Command::Select(
                rest.parse::<SupplierId>()
                    .with_context(|| format!("not a supplier id: {rest:?}"))?,
            ),
            "submit" | "save" => Command::Submit,
            "active" => Command::Active(
                rest.parse::<bool>()
                    .with_context(|| format!("expected true or false, got {rest:?}"))?,
            ),
            "show" => Command::Show,
            "cancel" => Command::Cancel,
            "registry" => match rest {
                "refresh" => Command::RegistryRefresh,
                "status" => Command::RegistryStatus,
                _ => bail!("usage: registry refresh|status"),
            },
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command {other:?} (type help)"),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_value_spaces() {
        assert_eq!(
            Command::parse("set legal_name  Acme Peru SAC ").unwrap(),
            Some(Command::Set {
                field: Field::LegalName,
                value: "Acme Peru SAC".to_string()
            })
        );
        assert_eq!(
            Command::parse("set taxId 20123456789").unwrap(),
            Some(Command::Set {
                field: Field::TaxId,
                value: "20123456789".to_string()
            })
        );
    }

    #[test]
    fn set_without_value_clears_field() {
        assert_eq!(
            Command::parse("set email").unwrap(),
            Some(Command::Set {
                field: Field::Email,
                value: String::new()
            })
        );
    }

    #[test]
    fn parses_simple_verbs() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("SUBMIT").unwrap(), Some(Command::Submit));
        assert_eq!(Command::parse("origin foreign").unwrap(), Some(Command::Origin(Origin::Foreign)));
        assert_eq!(Command::parse("active false").unwrap(), Some(Command::Active(false)));
        assert_eq!(Command::parse("registry status").unwrap(), Some(Command::RegistryStatus));
        assert_eq!(
            Command::parse("search Juan Perez").unwrap(),
            Some(Command::Search("Juan Perez".to_string()))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Command::parse("set").is_err());
        assert!(Command::parse("set branch 12").is_err());
        assert!(Command::parse("origin mars").is_err());
        assert!(Command::parse("active maybe").is_err());
        assert!(Command::parse("select 42").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }
}
