use std::fs::File;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fquery::common::{io_error_msg, reset_sigpipe};
use fquery::exec::run_query;
use fquery::plan::Query;
use fquery::sql;
use fquery::QueryError;

#[derive(Parser)]
#[command(
    name = "fquery",
    version,
    about = "Run SQL-style queries over CSV files",
    after_help = "Examples:\n  \
        fquery \"select name, amount from sales.csv where amount > 100 order by amount desc limit 10\"\n  \
        fquery sales.csv name,amount amount '>' 100 --sort amount --desc --limit 10\n  \
        cat sales.csv | fquery - name,amount\n\n\
        The first form is SQL mode (the argument starts with 'select');\n\
        everything else is simple mode. '-' or 'stdin' reads standard input."
)]
struct Cli {
    /// SQL SELECT statement, or FILE [COLUMNS] [COLUMN OP VALUE]
    #[arg(required = true)]
    query: Vec<String>,

    /// Sort by COLUMN (simple mode; SQL uses ORDER BY)
    #[arg(short = 's', long = "sort", value_name = "COLUMN")]
    sort: Option<String>,

    /// Sort descending (simple mode, together with --sort)
    #[arg(long = "desc")]
    desc: bool,

    /// Emit at most N rows; 0 means unbounded (simple mode)
    #[arg(short = 'n', long = "limit", value_name = "N")]
    limit: Option<u64>,

    /// Write the result to FILE instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,
}

/// Output sink enum to avoid Box<dyn Write> vtable dispatch.
enum Sink {
    Stdout(io::StdoutLock<'static>),
    File(File),
}

impl Write for Sink {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout(w) => w.write(buf),
            Sink::File(w) => w.write(buf),
        }
    }
    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Sink::Stdout(w) => w.write_all(buf),
            Sink::File(w) => w.write_all(buf),
        }
    }
    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout(w) => w.flush(),
            Sink::File(w) => w.flush(),
        }
    }
}

fn main() {
    reset_sigpipe();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let query: Query = if sql::is_sql_mode(&cli.query) {
        if cli.sort.is_some() || cli.desc || cli.limit.is_some() {
            eprintln!(
                "fquery: --sort/--desc/--limit are simple-mode flags; use ORDER BY and LIMIT in SQL"
            );
            process::exit(2);
        }
        // The statement may arrive shell-split across arguments.
        let text = cli.query.join(" ");
        match sql::parse_sql(&text) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("fquery: {}", e);
                process::exit(2);
            }
        }
    } else {
        match sql::parse_simple(&cli.query, cli.sort.as_deref(), cli.desc, cli.limit) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("fquery: {}", e);
                process::exit(2);
            }
        }
    };

    let result = match &cli.output {
        Some(path) => match File::create(path) {
            Ok(f) => run_query(&query, Sink::File(f)),
            Err(e) => {
                eprintln!("fquery: {}: {}", path, io_error_msg(&e));
                process::exit(1);
            }
        },
        None => run_query(&query, Sink::Stdout(io::stdout().lock())),
    };

    if let Err(e) = result {
        match &e {
            QueryError::Io(ioe) => eprintln!("fquery: {}", io_error_msg(ioe)),
            other => eprintln!("fquery: {}", other),
        }
        process::exit(1);
    }
}
