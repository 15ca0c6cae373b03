use std::io::{self, Write};

use dotdb::embed::{add_document, clamp_top_k, result_text, search_text};
use dotdb::sample::SAMPLE_TEXT;
use dotdb::{Config, DotDB, DotError, FileBackend, HashEmbedder, Metadata, MetadataValue};

#[derive(Debug, PartialEq)]
pub enum Command {
    Insert { vec: Vec<f32>, meta: Vec<(String, String)> },
    Search { vec: Vec<f32>, k_top: Option<usize> },
    Get { id: String },
    List,
    Count,
    Delete { ids: Vec<String> },
    Add { text: String },
    Query { text: String, k_top: Option<usize> },
}

const COMMANDS: &str = "get, insert, search, list, count, delete, add, query";

/// Parse a command from a provided argument vector
/// args[0] is the program name, args[1] the command
pub fn parse_command_from_args(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err(format!("No command provided. Use: {}", COMMANDS));
    }

    let command = &args[1];

    match command.as_str() {
        "get" => parse_get(args),
        "insert" => parse_insert(args),
        "search" => parse_search(args),
        "list" => parse_list(args),
        "count" => parse_count(args),
        "delete" => parse_delete(args),
        "add" => parse_add(args),
        "query" => parse_query(args),
        _ => Err(format!("Unknown command: {}. Available: {}", command, COMMANDS)),
    }
}

/// Parse the 'insert' command
/// Usage: insert <v1> <v2> ... [--meta key=value]...
fn parse_insert(args: &[String]) -> Result<Command, String> {
    let mut vec = Vec::new();
    let mut meta = Vec::new();

    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        if arg == "--meta" {
            let pair = rest.next().ok_or("'--meta' requires key=value")?;
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid metadata '{}', expected key=value", pair))?;
            meta.push((key.to_string(), value.to_string()));
        } else {
            let x = arg
                .parse::<f32>()
                .map_err(|_| format!("Vector parsing error at '{}'", arg))?;
            vec.push(x);
        }
    }

    if vec.is_empty() {
        return Err("'insert' command requires a vector. Usage: insert <v1> <v2> ... [--meta key=value]".to_string());
    }

    Ok(Command::Insert { vec, meta })
}

/// Split a trailing `--k_top <number>` off the arguments.
fn split_k_top(args: &[String]) -> Result<(&[String], Option<usize>), String> {
    if args.len() >= 2 && args[args.len() - 2] == "--k_top" {
        let raw = &args[args.len() - 1];
        let k = raw
            .parse::<usize>()
            .map_err(|_| format!("Invalid --k_top value: '{}'. Must be a non-negative integer.", raw))?;
        return Ok((&args[..args.len() - 2], Some(k)));
    }

    Ok((args, None))
}

/// Parse the 'search' command
/// Usage: search <v1> <v2> ... [--k_top <number>]
fn parse_search(args: &[String]) -> Result<Command, String> {
    let (components, k_top) = split_k_top(&args[2..])?;

    let vec: Vec<f32> = components
        .iter()
        .map(|s| s.parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|_| "Failed to parse vector components as numbers".to_string())?;

    if vec.is_empty() {
        return Err("Search vector cannot be empty".to_string());
    }

    Ok(Command::Search { vec, k_top })
}

/// Parse the 'get' command
/// Usage: get <id>
fn parse_get(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'get' command requires an ID. Usage: get <id>".to_string());
    }

    Ok(Command::Get { id: args[2].clone() })
}

/// Parse the 'list' command
fn parse_list(args: &[String]) -> Result<Command, String> {
    if args.len() > 2 {
        eprintln!("Warning: 'list' command takes no arguments, ignoring extras");
    }

    Ok(Command::List)
}

/// Parse the 'count' command
fn parse_count(args: &[String]) -> Result<Command, String> {
    if args.len() > 2 {
        eprintln!("Warning: 'count' command takes no arguments, ignoring extras");
    }

    Ok(Command::Count)
}

/// Parse the 'delete' command
/// Usage: delete <id>...
fn parse_delete(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'delete' command requires at least one ID. Usage: delete <id>...".to_string());
    }

    Ok(Command::Delete { ids: args[2..].to_vec() })
}

/// Parse the 'add' command
/// Usage: add <text>, a literal `\n` in the text is a line break
///        add --sample
fn parse_add(args: &[String]) -> Result<Command, String> {
    if args.len() == 3 && args[2] == "--sample" {
        return Ok(Command::Add { text: SAMPLE_TEXT.to_string() });
    }

    let text = args[2..].join(" ").replace("\\n", "\n");
    if text.trim().is_empty() {
        return Err("'add' command requires text. Usage: add <text> | add --sample".to_string());
    }

    Ok(Command::Add { text })
}

/// Parse the 'query' command
/// Usage: query <text> [--k_top <number>]
fn parse_query(args: &[String]) -> Result<Command, String> {
    let (words, k_top) = split_k_top(&args[2..])?;
    if words.is_empty() {
        return Err("'query' command requires text. Usage: query <text> [--k_top N]".to_string());
    }

    Ok(Command::Query { text: words.join(" "), k_top })
}

/// REPL mode - interactive session over a persistent store
pub async fn run_repl(config: &Config) -> Result<(), DotError> {
    let embedder = HashEmbedder::new(config.dimension)?;
    let mut db = DotDB::new(config.dimension, FileBackend::new(&config.data_dir))?;
    let is_new = db.connect(&config.store_name).await?;

    println!("DotDB - Vector Database");
    println!(
        "Store '{}' ({} dimensions, {} vectors{})",
        config.store_name,
        config.dimension,
        db.count(),
        if is_new { ", new" } else { "" }
    );
    println!("Type 'help' for commands, 'exit' or 'quit' to quit\n");

    loop {
        print!("dotdb> ");
        io::stdout().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                continue;
            }
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input == "exit" || input == "quit" {
            println!("Goodbye!");
            break;
        }

        if input == "help" {
            print_help();
            continue;
        }

        let mut args: Vec<String> = vec!["dotdb".to_string()];
        args.extend(input.split_whitespace().map(|s| s.to_string()));

        let command = match parse_command_from_args(&args) {
            Ok(cmd) => cmd,
            Err(error) => {
                eprintln!("Error: {}", error);
                continue;
            }
        };

        execute_command(&mut db, &embedder, config, command).await;
    }

    Ok(())
}

async fn execute_command(db: &mut DotDB<FileBackend>, embedder: &HashEmbedder, config: &Config, command: Command) {
    match command {
        Command::Get { id } => {
            match db.get(&id) {
                Some(vector) => println!("Vector '{}': {:?} {:?}", id, vector.values, vector.metadata),
                None => eprintln!("Error: Vector '{}' not found", id),
            }
        }

        Command::List => {
            let vectors = db.get_all();
            if vectors.is_empty() {
                println!("Database is empty");
            } else {
                println!("Stored vectors:");
                for vector in &vectors {
                    println!("  {}: {:?}", vector.id, vector.values);
                }
                println!("Total: {} vectors", vectors.len());
            }
        }

        Command::Count => println!("{}", db.count()),

        Command::Insert { vec, meta } => {
            let metadata = (!meta.is_empty()).then(|| {
                meta.into_iter()
                    .map(|(k, v)| (k, MetadataValue::Text(v)))
                    .collect::<Metadata>()
            });

            match db.insert(vec, metadata).await {
                Ok(id) => println!("Inserted vector with id: {}", id),
                Err(error) => eprintln!("Error: {}", error),
            }
        }

        Command::Search { vec, k_top } => {
            match db.search(&vec, k_top.unwrap_or(config.default_top_k)) {
                Ok(results) => {
                    if results.is_empty() {
                        println!("No results found");
                    } else {
                        println!("Top {} results:", results.len());
                        for (rank, result) in results.iter().enumerate() {
                            println!("{}. ID: {}, Score: {:.4}, Vector: {:?}",
                                rank + 1, result.vector.id, result.score, result.vector.values);
                        }
                    }
                }
                Err(error) => eprintln!("Error: {}", error),
            }
        }

        Command::Delete { ids } => {
            match db.delete_many(&ids).await {
                Ok(()) => println!("Deleted {} id(s)", ids.len()),
                Err(error) => eprintln!("Error: {}", error),
            }
        }

        Command::Add { text } => {
            match add_document(db, embedder, &text).await {
                Ok(added) => {
                    for (id, paragraph) in &added {
                        println!("  {}: {}", id, paragraph);
                    }
                    println!("Added {} paragraph(s)", added.len());
                }
                Err(error) => eprintln!("Error: {}", error),
            }
        }

        Command::Query { text, k_top } => {
            let requested = k_top.map_or(0, |k| i64::try_from(k).unwrap_or(i64::MAX));
            let top_k = clamp_top_k(requested, config.default_top_k, config.max_top_k);

            match search_text(&*db, embedder, &text, top_k) {
                Ok(results) if results.is_empty() => println!("No results found"),
                Ok(results) => {
                    for (rank, result) in results.iter().enumerate() {
                        println!("{}. Score: {:.4} - {}", rank + 1, result.score, result_text(result));
                    }
                }
                Err(error) => eprintln!("Error: {}", error),
            }
        }
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  insert <v1> <v2> ... [--meta k=v]  - Insert a vector, prints its id");
    println!("  search <v1> <v2> ... [--k_top N]   - Search for similar vectors");
    println!("  get <id>                           - Retrieve a vector by ID");
    println!("  list                               - List all vectors");
    println!("  count                              - Show vector count");
    println!("  delete <id>...                     - Delete vectors");
    println!("  add <text>                         - Embed text, one vector per paragraph (\\n\\n splits)");
    println!("  add --sample                       - Add the bundled sample document");
    println!("  query <text> [--k_top N]           - Embed text and search");
    println!("  help                               - Show this help");
    println!("  exit, quit                         - Exit the program");
}
