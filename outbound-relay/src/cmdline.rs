use clap::{Arg, Command};

pub(super) const ARG_ADDR: &str = "addr";
pub(super) const ARG_NAME: &str = "name";

pub(super) fn root_cli() -> Command {
    Command::new("outbound-relay")
        .about("Relays stdin lines to a TCP peer through an ordered outbound sender")
        .arg(
            Arg::new(ARG_ADDR)
                .long(ARG_ADDR)
                .value_name("HOST:PORT")
                .required(true)
                .help("Address of the TCP peer"),
        )
        .arg(
            Arg::new(ARG_NAME)
                .long(ARG_NAME)
                .value_name("NAME")
                .help("Sender name, overrides OUTBOUND_SENDER_NAME"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        root_cli().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let matches = root_cli()
            .try_get_matches_from(["outbound-relay", "--addr", "127.0.0.1:7000", "--name", "r1"])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>(ARG_ADDR).map(String::as_str),
            Some("127.0.0.1:7000")
        );
        assert_eq!(
            matches.get_one::<String>(ARG_NAME).map(String::as_str),
            Some("r1")
        );

        assert!(root_cli().try_get_matches_from(["outbound-relay"]).is_err());
    }
}
