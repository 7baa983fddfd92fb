//! Interactive command shell
//!
//! Reads one command per line until `exit` (or end of input):
//! - `insert <serial> <signer> <comp1,comp2,...>`
//! - `check <serial>`
//! - `get`
//! - `exit`
//!
//! Failures of a single command are reported and the loop keeps going.

use std::io::{BufRead, Write};
use crate::certificate::{Certificate, split_components};
use crate::storage::CertificateStore;

pub const PROMPT: &str = "Enter command (insert, check, get, exit): ";
pub const INSERT_USAGE: &str = "Usage: insert <serialNumber> <signer> <component1,component2,...>";
pub const CHECK_USAGE: &str = "Usage: check <serialNumber>";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Valid commands are: insert, check, get, exit.";

/// A parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Insert {
        serial_number: String,
        signer: String,
        components: Vec<String>,
    },
    Check {
        serial_number: String,
    },
    Get,
    Exit,
    /// Recognised verb with the wrong arguments; carries the usage line
    Usage(&'static str),
    Unknown,
}

impl ShellCommand {
    /// Parse a line. Verbs are matched by prefix, `exit` must match exactly.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let args: Vec<&str> = line.split_whitespace().skip(1).collect();

        if line.starts_with("insert") {
            let [serial_number, signer, components] = args.as_slice() else {
                return ShellCommand::Usage(INSERT_USAGE);
            };
            let components = split_components(components);
            if components.is_empty() {
                return ShellCommand::Usage(INSERT_USAGE);
            }
            ShellCommand::Insert {
                serial_number: serial_number.to_string(),
                signer: signer.to_string(),
                components,
            }
        } else if line.starts_with("check") {
            match args.as_slice() {
                [serial_number] => ShellCommand::Check {
                    serial_number: serial_number.to_string(),
                },
                _ => ShellCommand::Usage(CHECK_USAGE),
            }
        } else if line.starts_with("get") {
            ShellCommand::Get
        } else if line == "exit" {
            ShellCommand::Exit
        } else {
            ShellCommand::Unknown
        }
    }
}

/// The read-eval loop over a store
pub struct Shell<'a> {
    store: &'a CertificateStore,
}

impl<'a> Shell<'a> {
    pub fn new(store: &'a CertificateStore) -> Self {
        Self { store }
    }

    /// Run until `exit` or end of input. Only I/O errors on the terminal
    /// itself end the loop early.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, out: &mut W) -> std::io::Result<()> {
        let mut line = String::new();
        loop {
            write!(out, "{}", PROMPT)?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                tracing::debug!("End of input, leaving shell");
                break;
            }

            if !self.execute(ShellCommand::parse(&line), out)? {
                break;
            }
        }
        Ok(())
    }

    /// Execute one command, returning `false` when the loop should stop
    pub fn execute<W: Write>(&self, command: ShellCommand, out: &mut W) -> std::io::Result<bool> {
        match command {
            ShellCommand::Insert {
                serial_number,
                signer,
                components,
            } => {
                let cert = Certificate::new(serial_number, signer, components);
                match self.store.insert_certificate(&cert) {
                    Ok(()) => writeln!(out, "Certificate inserted successfully.")?,
                    Err(e) => writeln!(out, "Failed to insert certificate: {}", e)?,
                }
            }
            ShellCommand::Check { serial_number } => match self.store.certificate_exists(&serial_number) {
                Ok(true) => writeln!(out, "Certificate with serial number {} exists.", serial_number)?,
                Ok(false) => writeln!(out, "Certificate with serial number {} does not exist.", serial_number)?,
                Err(e) => writeln!(out, "Error checking certificate existence: {}", e)?,
            },
            ShellCommand::Get => match self.store.get_certificates() {
                Ok(certs) if certs.is_empty() => writeln!(out, "No certificates stored.")?,
                Ok(certs) => {
                    for cert in certs {
                        writeln!(out, "{}", cert)?;
                    }
                }
                Err(e) => writeln!(out, "Failed to retrieve certificates: {}", e)?,
            },
            ShellCommand::Exit => {
                writeln!(out, "Exiting...")?;
                return Ok(false);
            }
            ShellCommand::Usage(usage) => writeln!(out, "{}", usage)?,
            ShellCommand::Unknown => writeln!(out, "{}", UNKNOWN_COMMAND)?,
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::SchemaProfile;
    use std::io::Cursor;

    fn run_script(store: &CertificateStore, script: &str) -> String {
        let mut out = Vec::new();
        Shell::new(store).run(Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ShellCommand::parse("insert SN001 AcmeCA bootloader,kernel\n"),
            ShellCommand::Insert {
                serial_number: "SN001".to_string(),
                signer: "AcmeCA".to_string(),
                components: vec!["bootloader".to_string(), "kernel".to_string()],
            }
        );
        assert_eq!(
            ShellCommand::parse("  check   SN001 "),
            ShellCommand::Check { serial_number: "SN001".to_string() }
        );
        assert_eq!(ShellCommand::parse("get"), ShellCommand::Get);
        assert_eq!(ShellCommand::parse("exit"), ShellCommand::Exit);
        assert_eq!(ShellCommand::parse("exit now"), ShellCommand::Unknown);
        assert_eq!(ShellCommand::parse("delete SN001"), ShellCommand::Unknown);
        assert_eq!(ShellCommand::parse(""), ShellCommand::Unknown);
    }

    #[test]
    fn test_parse_malformed_arguments() {
        assert_eq!(ShellCommand::parse("insert A B"), ShellCommand::Usage(INSERT_USAGE));
        assert_eq!(ShellCommand::parse("insert A B c d"), ShellCommand::Usage(INSERT_USAGE));
        assert_eq!(ShellCommand::parse("insert A B ,,"), ShellCommand::Usage(INSERT_USAGE));
        assert_eq!(ShellCommand::parse("check"), ShellCommand::Usage(CHECK_USAGE));
    }

    #[test]
    fn test_session() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        let output = run_script(
            &store,
            "insert SN001 AcmeCA bootloader,kernel\ncheck SN001\ncheck SN999\nget\nexit\n",
        );

        assert!(output.contains("Certificate inserted successfully."));
        assert!(output.contains("Certificate with serial number SN001 exists."));
        assert!(output.contains("Certificate with serial number SN999 does not exist."));
        assert!(output.contains("Certificate: Serial=SN001, Signer=AcmeCA, Components=[bootloader, kernel]"));
        assert!(output.ends_with("Exiting...\n"));
    }

    #[test]
    fn test_usage_does_not_touch_store_and_loop_continues() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        let output = run_script(&store, "insert A B\nbogus\ncheck A\nexit\n");

        assert!(output.contains(INSERT_USAGE));
        assert!(output.contains(UNKNOWN_COMMAND));
        assert!(output.contains("Certificate with serial number A does not exist."));
        assert_eq!(store.count_certificates().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_insert_is_reported_and_loop_continues() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Dated).unwrap();
        let output = run_script(
            &store,
            "insert SN1 AcmeCA fw\ninsert SN1 OtherCA fw\nget\nexit\n",
        );

        assert!(output.contains("Failed to insert certificate: Certificate with serial number SN1 already exists"));
        assert!(output.contains("Signer=AcmeCA"));
        assert!(output.contains("Expires="));
        assert!(!output.contains("OtherCA"));
    }

    #[test]
    fn test_end_of_input_stops_loop() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        let output = run_script(&store, "get\n");
        assert!(output.contains("No certificates stored."));
        assert_eq!(output.matches(PROMPT).count(), 2);
    }
}
