use argh::FromArgs;
use tinysh::{Flow, Interpreter, logging};

#[derive(FromArgs)]
/// A small interactive POSIX-style shell.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status
    command: Option<String>,

    #[argh(option)]
    /// log filter for the shell's own diagnostics (overrides TINYSH_LOG)
    log: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    logging::init(args.log.as_deref())?;

    let mut sh = Interpreter::default();
    let code = match args.command {
        Some(line) => match sh.execute_line(&line) {
            Flow::Exit(code) => code,
            Flow::Continue => sh.session().last_status,
        },
        None => sh.repl()?,
    };
    std::process::exit(code)
}
