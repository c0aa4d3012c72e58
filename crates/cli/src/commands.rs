//! Subcommand implementations.
//!
//! Each command reads from a file or stdin and writes its result to the given
//! output, so commands can be driven from tests with in-memory buffers.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use anyhow::Context;
use cmkit_codec::json::{from_json_str, to_json_string, to_json_string_pretty};
use cmkit_codec::soap::{SoapRequest, decode_soap_reader};
use cmkit_codec::xml::decode_reader;
use cmkit_codec::{DecodeOptions, EncodeOptions, RootScope, Tree, encode_with};
use tracing::info;

use crate::config::{CliConfig, Command, DecodeArgs, EncodeArgs, EnvelopeArgs};

/// Runs the configured subcommand, writing its output to `out`.
pub fn run(config: &CliConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    match &config.command {
        Command::Decode(args) => decode(args, config.window_size, out),
        Command::Encode(args) => encode(args, out),
        Command::Envelope(args) => envelope(args, out),
    }
}

fn decode(args: &DecodeArgs, window_size: usize, out: &mut dyn Write) -> anyhow::Result<()> {
    let input = open_input(args.input.as_deref())?;

    let mut options = DecodeOptions::default().window_size(window_size);
    if let Some(label) = &args.charset {
        options = options.charset(label)?;
    }

    let tree = match &args.soap_action {
        Some(action) => decode_soap_reader(input, action, &options)
            .with_context(|| format!("decoding {}", describe_path(args.input.as_deref())))?
            .unwrap_or_else(Tree::mapping),
        None => {
            if let Some(scope) = &args.scope {
                options.scope = scope.parse::<RootScope>()?;
            }
            decode_reader(input, &options)
                .with_context(|| format!("decoding {}", describe_path(args.input.as_deref())))?
        }
    };

    let json = if args.compact {
        to_json_string(&tree)?
    } else {
        to_json_string_pretty(&tree)?
    };
    writeln!(out, "{}", json)?;

    info!(input = %describe_path(args.input.as_deref()), "Decoded document");
    Ok(())
}

fn encode(args: &EncodeArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let params = read_params(args.input.as_deref())?;
    let options = EncodeOptions::default()
        .indent(args.indent.as_str())
        .escape(!args.no_escape);

    out.write_all(encode_with(&params, &options)?.as_bytes())?;
    info!(input = %describe_path(args.input.as_deref()), "Encoded parameters");
    Ok(())
}

fn envelope(args: &EnvelopeArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let params = read_params(args.input.as_deref())?;
    let api_key = args
        .api_key
        .as_deref()
        .context("an API key is required")?;

    let request = SoapRequest::new(args.action.as_str(), api_key)
        .namespace(args.namespace.as_str())
        .params(params);
    writeln!(out, "{}", request.envelope()?)?;

    info!(action = %args.action, soap_action = %request.soap_action(), "Built request envelope");
    Ok(())
}

/// Reads a JSON parameter tree. Empty input means no parameters.
fn read_params(path: Option<&Path>) -> anyhow::Result<Tree> {
    let text = read_to_string(open_input(path)?)?;
    if text.trim().is_empty() {
        return Ok(Tree::mapping());
    }
    from_json_str(&text).with_context(|| format!("reading parameters from {}", describe_path(path)))
}

fn open_input(path: Option<&Path>) -> anyhow::Result<Box<dyn Read>> {
    match path {
        None => Ok(Box::new(io::stdin().lock())),
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdin().lock())),
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn read_to_string(mut input: impl Read) -> anyhow::Result<String> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    Ok(text)
}

fn describe_path(path: Option<&Path>) -> String {
    match path {
        Some(path) if path != Path::new("-") => path.display().to_string(),
        _ => "stdin".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;
    use std::fs;

    /// Writes `contents` to a fresh file under the system temp dir.
    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("cmkit-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn run_to_string(config: CliConfig) -> String {
        let mut out = Vec::new();
        run(&config, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_decode_command_prints_json() {
        let path = temp_file("decode.xml", "<r><a>1</a><a>2</a></r>");
        let config = CliConfig {
            command: Command::Decode(DecodeArgs {
                input: Some(path),
                compact: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(run_to_string(config), "{\"r\":{\"a\":[\"1\",\"2\"]}}\n");
    }

    #[test]
    fn test_decode_command_soap_action() {
        let path = temp_file(
            "soap.xml",
            "<soap:Envelope><soap:Body><X.GetResponse><X.GetResult><Code>0</Code>\
             </X.GetResult></X.GetResponse></soap:Body></soap:Envelope>",
        );
        let config = CliConfig {
            command: Command::Decode(DecodeArgs {
                input: Some(path),
                soap_action: Some("X.Get".to_string()),
                compact: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(run_to_string(config), "{\"Code\":\"0\"}\n");
    }

    #[test]
    fn test_decode_command_soap_action_streams_latin1() {
        let dir = env::temp_dir().join(format!("cmkit-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("soap-latin1.xml");
        fs::write(
            &path,
            b"<soap:Envelope><soap:Body><X.GetResponse><X.GetResult><Name>Caf\xE9</Name>\
              </X.GetResult></X.GetResponse></soap:Body></soap:Envelope>",
        )
        .unwrap();

        let config = CliConfig {
            window_size: 3,
            command: Command::Decode(DecodeArgs {
                input: Some(path),
                soap_action: Some("X.Get".to_string()),
                charset: Some("latin1".to_string()),
                compact: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(run_to_string(config), "{\"Name\":\"Caf\u{e9}\"}\n");
    }

    #[test]
    fn test_decode_command_reports_line() {
        let path = temp_file("broken.xml", "<r>\n<a>\n");
        let config = CliConfig {
            command: Command::Decode(DecodeArgs {
                input: Some(path),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = run(&config, &mut Vec::new()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_encode_command() {
        let path = temp_file("params.json", r#"{"ListID":"42","Emails":["a","b"]}"#);
        let config = CliConfig {
            command: Command::Encode(EncodeArgs {
                input: Some(path),
                indent: "\t".to_string(),
                no_escape: false,
            }),
            ..Default::default()
        };
        assert_eq!(
            run_to_string(config),
            "\t<ListID>42</ListID>\n\t<Emails>a</Emails>\n\t<Emails>b</Emails>\n"
        );
    }

    #[test]
    fn test_envelope_command() {
        let path = temp_file("envelope.json", r#"{"ListID":"42"}"#);
        let config = CliConfig {
            command: Command::Envelope(EnvelopeArgs {
                action: "Subscriber.Add".to_string(),
                namespace: "http://example.com/api/".to_string(),
                api_key: Some("secret".to_string()),
                input: Some(path),
            }),
            ..Default::default()
        };
        let body = run_to_string(config);
        assert!(body.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"));
        assert!(body.contains("\t<Subscriber.Add xmlns=\"http://example.com/api/\">\n"));
        assert!(body.contains("\t\t<ApiKey>secret</ApiKey>\n\t\t<ListID>42</ListID>\n"));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let config = CliConfig {
            command: Command::Encode(EncodeArgs {
                input: Some(PathBuf::from("/nonexistent/cmkit/params.json")),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = run(&config, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("opening"));
    }
}
