use pieces::app::StartupOptions;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    sets: Vec<String>,
    no_shuffle: bool,
    looping: bool,
    list_sets: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    if args.list_sets {
        let settings = pieces::config::load_settings()?;
        let sets_dir = settings.resolved_sets_dir()?;
        for name in pieces::library::available_sets(&sets_dir)? {
            println!("{name}");
        }
        return Ok(());
    }

    pieces::app::run(StartupOptions {
        sets: args.sets,
        no_shuffle: args.no_shuffle,
        looping: args.looping,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--set" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--set requires a directory set name");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--set cannot be empty");
                }
                out.sets.push(value.trim().to_string());
            }
            "--no-shuffle" => out.no_shuffle = true,
            "--loop" => out.looping = true,
            "--list-sets" => out.list_sets = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("Pieces");
    println!("  --set NAME        Load directory set NAME (repeatable)");
    println!("  --no-shuffle      Play pieces in library order");
    println!("  --loop            Start over when the playlist ends");
    println!("  --list-sets       Print available directory sets and exit");
}
