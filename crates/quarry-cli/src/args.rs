use std::path::PathBuf;

pub const USAGE: &str =
    "usage: quarry <world-dir> [-o|--output FILE] [--config FILE] [--verify]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub world: PathBuf,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub verify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Convert(Args),
}

impl Command {
    /// Parses everything after the program name.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Command, String> {
        let mut args = args.into_iter();
        let mut world = None;
        let mut output = None;
        let mut config = None;
        let mut verify = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "-o" | "--output" => output = Some(value_of(&arg, args.next())?),
                "--config" => config = Some(value_of(&arg, args.next())?),
                "--verify" => verify = true,
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(format!("unknown option `{}`", flag))
                }
                _ if world.is_some() => return Err(format!("unexpected argument `{}`", arg)),
                _ => world = Some(PathBuf::from(&arg)),
            }
        }

        let world = world.ok_or_else(|| "need a world to work with".to_owned())?;
        Ok(Command::Convert(Args {
            world,
            output,
            config,
            verify,
        }))
    }
}

fn value_of(flag: &str, value: Option<String>) -> Result<PathBuf, String> {
    value
        .map(PathBuf::from)
        .ok_or_else(|| format!("`{}` needs a file", flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        Command::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_world_only() {
        assert_eq!(
            parse(&["saves/lobby"]),
            Ok(Command::Convert(Args {
                world: PathBuf::from("saves/lobby"),
                output: None,
                config: None,
                verify: false,
            }))
        );
    }

    #[test]
    fn test_all_options() {
        let Ok(Command::Convert(args)) = parse(&[
            "--config",
            "q.json",
            "lobby",
            "-o",
            "out.slime",
            "--verify",
        ]) else {
            panic!("expected a conversion");
        };
        assert_eq!(args.world, PathBuf::from("lobby"));
        assert_eq!(args.output, Some(PathBuf::from("out.slime")));
        assert_eq!(args.config, Some(PathBuf::from("q.json")));
        assert!(args.verify);
    }

    #[test]
    fn test_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["lobby", "-o"]).is_err());
        assert!(parse(&["lobby", "--fast"]).is_err());
        assert!(parse(&["lobby", "hub"]).is_err());
        assert_eq!(parse(&["lobby", "--help"]), Ok(Command::Help));
    }
}
