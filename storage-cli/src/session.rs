use std::io::BufRead;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use rustyline::config::Builder;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Editor};
use state_storage::backend::NullBackend;
use state_storage::condition::Condition;
use state_storage::state_storage::StateStorage;
use tokio::time::Instant;

use crate::config::{ConfigLoad, DEFAULT_PROMPT};
use crate::rusty::CliHelper;

const KEYWORDS: &[&str] = &[
    "create", "set", "get", "delete", "keys", "savepoint", "rollback", "hash", "help", "exit",
    "quit",
];

pub struct Session {
    is_repl: bool,
    settings: ConfigLoad,
    query: String,
    storage: Arc<StateStorage>,
    keywords: Arc<Vec<String>>,
}

impl Session {
    pub async fn try_new(settings: ConfigLoad, is_repl: bool) -> Result<Self> {
        if is_repl {
            println!("Welcome to storage-cli.");
            println!();
        }

        Ok(Self {
            is_repl,
            settings,
            query: String::new(),
            storage: Arc::new(StateStorage::new(None, Some(Arc::new(NullBackend)), 0)),
            keywords: Arc::new(KEYWORDS.iter().map(|s| s.to_string()).collect()),
        })
    }

    fn prompt(&self) -> String {
        match self.settings.prompt.as_deref() {
            Some(p) if !p.trim().is_empty() => format!("{} > ", p.trim_end()),
            _ => format!("{} > ", DEFAULT_PROMPT),
        }
    }

    pub async fn handle_repl(&mut self) {
        let config = Builder::new()
            .completion_prompt_limit(5)
            .completion_type(CompletionType::Circular)
            .build();
        let mut rl = Editor::<CliHelper, DefaultHistory>::with_config(config).unwrap();

        rl.set_helper(Some(CliHelper::with_keywords(self.keywords.clone())));
        rl.load_history(&history_path()).ok();

        loop {
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    match self.handle_query(true, &line).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => eprintln!("error: {e}"),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("io err: {e}");
                    break;
                }
            }
        }

        println!("Bye~");
        let _ = rl.save_history(&history_path());
    }

    pub async fn handle_reader<R: BufRead>(&mut self, r: R) -> Result<()> {
        let start = Instant::now();
        for line in r.lines() {
            let line = line.map_err(|e| anyhow!("read lines err: {e}"))?;
            if !self.handle_query(false, &line).await? {
                break;
            }
        }

        if self.settings.show_stats.unwrap_or(false) {
            println!("{:.3}", start.elapsed().as_secs_f64());
        }
        Ok(())
    }

    /// Returns `Ok(false)` when the REPL/reader loop should stop, `Ok(true)`
    /// to keep going.
    async fn handle_query(&mut self, is_repl: bool, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(true);
        }
        if is_repl && (line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")) {
            return Ok(false);
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match self.dispatch(&tokens) {
            Ok(output) => {
                if !output.is_empty() {
                    println!("{output}");
                }
            }
            Err(e) => eprintln!("error: {e}"),
        }
        Ok(true)
    }

    fn dispatch(&self, tokens: &[&str]) -> Result<String> {
        let Some((cmd, args)) = tokens.split_first() else {
            return Ok(String::new());
        };

        match cmd.to_ascii_lowercase().as_str() {
            "help" => Ok(help_text()),
            "create" => self.cmd_create(args),
            "set" => self.cmd_set(args),
            "get" => self.cmd_get(args),
            "delete" => self.cmd_delete(args),
            "keys" => self.cmd_keys(args),
            "savepoint" => Ok(self.storage.savepoint().to_string()),
            "rollback" => self.cmd_rollback(args),
            "hash" => Ok(self.cmd_hash()),
            other => Err(anyhow!("unknown command: {other} (try `help`)")),
        }
    }

    fn cmd_create(&self, args: &[&str]) -> Result<String> {
        let [name, fields] = args else {
            return Err(anyhow!("usage: create <table> <field1,field2,...>"));
        };
        let fields: Vec<String> = fields.split(',').map(|s| s.to_string()).collect();
        self.storage.create_table(name, fields)?;
        Ok(format!("table {name} created"))
    }

    fn cmd_set(&self, args: &[&str]) -> Result<String> {
        let [table, key, fields, version] = args else {
            return Err(anyhow!(
                "usage: set <table> <key> <field=value[,field=value...]> <version>"
            ));
        };
        let handle = self
            .storage
            .open_table(table)
            .ok_or_else(|| anyhow!("no such table: {table}"))?;
        let mut entry = handle.new_entry();
        for assignment in fields.split(',') {
            let (field, value) = assignment
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed field assignment: {assignment}"))?;
            entry.set_field(field, value)?;
        }
        entry.set_version(version.parse()?);
        handle.set_row(key.as_bytes().to_vec(), entry)?;
        Ok(format!("ok, {key} set in {table}"))
    }

    fn cmd_get(&self, args: &[&str]) -> Result<String> {
        let [table, key] = args else {
            return Err(anyhow!("usage: get <table> <key>"));
        };
        let handle = self
            .storage
            .open_table(table)
            .ok_or_else(|| anyhow!("no such table: {table}"))?;
        match handle.get_row(key.as_bytes())? {
            None => Ok("(not found)".to_string()),
            Some(entry) => {
                let fields: Vec<String> = handle
                    .table_info()
                    .fields()
                    .iter()
                    .map(|name| format!("{name}={}", entry.get_field(name).unwrap_or_default()))
                    .collect();
                Ok(format!(
                    "status={:?} version={} {}",
                    entry.status(),
                    entry.version(),
                    fields.join(" ")
                ))
            }
        }
    }

    fn cmd_delete(&self, args: &[&str]) -> Result<String> {
        let [table, key, version] = args else {
            return Err(anyhow!("usage: delete <table> <key> <version>"));
        };
        let handle = self
            .storage
            .open_table(table)
            .ok_or_else(|| anyhow!("no such table: {table}"))?;
        let mut tombstone = handle.new_deleted_entry();
        tombstone.set_version(version.parse()?);
        handle.set_row(key.as_bytes().to_vec(), tombstone)?;
        Ok(format!("ok, {key} tombstoned in {table}"))
    }

    fn cmd_keys(&self, args: &[&str]) -> Result<String> {
        let [table] = args else {
            return Err(anyhow!("usage: keys <table>"));
        };
        let handle = self
            .storage
            .open_table(table)
            .ok_or_else(|| anyhow!("no such table: {table}"))?;
        let keys = handle.get_primary_keys(&Condition::new())?;
        let rendered: Vec<String> = keys
            .iter()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .collect();
        Ok(rendered.join("\n"))
    }

    fn cmd_rollback(&self, args: &[&str]) -> Result<String> {
        let [savepoint] = args else {
            return Err(anyhow!("usage: rollback <savepoint>"));
        };
        self.storage.rollback(savepoint.parse()?)?;
        Ok("ok, rolled back".to_string())
    }

    fn cmd_hash(&self) -> String {
        let hashes = self.storage.table_hashes();
        let mut names: Vec<&String> = hashes.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| format!("{name}: {}", hex::encode(&hashes[name])))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn help_text() -> String {
    [
        "create <table> <field1,field2,...>",
        "set <table> <key> <field=value[,field=value...]> <version>",
        "get <table> <key>",
        "delete <table> <key> <version>",
        "keys <table>",
        "savepoint",
        "rollback <savepoint>",
        "hash",
        "exit | quit",
    ]
    .join("\n")
}

fn history_path() -> String {
    format!(
        "{}/.storage_cli_history",
        std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
    )
}
