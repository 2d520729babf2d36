//! Compare a stored date against a time expression

use anyhow::Result;
use clap::Args;
use date_store::DateStore;
use owo_colors::OwoColorize;
use std::cmp::Ordering;
use std::process::ExitCode;

/// Exactly one comparison per invocation
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct CheckArgs {
    /// Stored date is earlier than EXPR ("last saved more than 1 day ago")
    #[arg(long, value_name = "EXPR")]
    more_than: Option<String>,

    /// Stored date is later than EXPR ("last saved less than 1 day ago")
    #[arg(long, value_name = "EXPR")]
    less_than: Option<String>,

    /// Stored date is earlier than or equal to EXPR
    #[arg(long, value_name = "EXPR")]
    older_or_equal: Option<String>,

    /// Stored date is later than or equal to EXPR
    #[arg(long, value_name = "EXPR")]
    newer_or_equal: Option<String>,
}

impl CheckArgs {
    /// The expression and the test applied to `stored.cmp(target)`
    fn test(&self) -> Option<(&str, fn(Ordering) -> bool)> {
        let tests: [(&Option<String>, fn(Ordering) -> bool); 4] = [
            (&self.more_than, Ordering::is_lt),
            (&self.less_than, Ordering::is_gt),
            (&self.older_or_equal, Ordering::is_le),
            (&self.newer_or_equal, Ordering::is_ge),
        ];
        tests
            .into_iter()
            .find_map(|(expr, test)| expr.as_deref().map(|expr| (expr, test)))
    }
}

/// Prints true/false (exit 0/1); exit 2 when the comparison cannot be made
pub fn run(store: &DateStore, key: &str, args: &CheckArgs) -> Result<ExitCode> {
    let Some((expr, test)) = args.test() else {
        anyhow::bail!("No comparison given");
    };

    match store.last_saved(key).compare(expr) {
        Ok(ordering) => {
            let holds = test(ordering);
            println!("{}", holds);
            Ok(if holds {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            Ok(ExitCode::from(2))
        }
    }
}
