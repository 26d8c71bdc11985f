#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    User(String),
    Search(String),
    Tag(String),
    Open(String),
    Feed,
    Explore,
    Stories,
    Story(String),
    Post,
    Notifications,
    ReadAll,
    Messages,
    Dm(String),
    Help,
    Logout,
    Quit,
}

pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.strip_prefix(':').unwrap_or(input).trim();

    if input.is_empty() {
        return None;
    }

    let (cmd, args) = match input.split_once(char::is_whitespace) {
        Some((cmd, args)) => (cmd, args.trim()),
        None => (input, ""),
    };

    match cmd {
        "user" | "u" if !args.is_empty() => Some(Command::User(strip_at(args).to_owned())),
        "search" if !args.is_empty() => Some(Command::Search(args.to_owned())),
        "tag" | "t" if !args.is_empty() => {
            Some(Command::Tag(args.trim_start_matches('#').to_owned()))
        }
        "open" if !args.is_empty() => Some(Command::Open(args.to_owned())),
        "story" if !args.is_empty() => Some(Command::Story(args.to_owned())),
        "dm" if !args.is_empty() => Some(Command::Dm(strip_at(args).to_owned())),
        "feed" | "home" => Some(Command::Feed),
        "explore" | "e" => Some(Command::Explore),
        "stories" | "s" => Some(Command::Stories),
        "post" | "p" => Some(Command::Post),
        "notifications" | "n" => Some(Command::Notifications),
        "readall" => Some(Command::ReadAll),
        "messages" | "m" => Some(Command::Messages),
        "help" | "h" => Some(Command::Help),
        "logout" => Some(Command::Logout),
        "quit" | "q" => Some(Command::Quit),
        _ => None,
    }
}

pub fn strip_at(username: &str) -> &str {
    username.strip_prefix('@').unwrap_or(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_user() {
        assert_eq!(
            parse_command(":user @alice"),
            Some(Command::User("alice".into()))
        );
        assert_eq!(parse_command("u bob"), Some(Command::User("bob".into())));
        assert_eq!(parse_command(":user"), None);
    }

    #[test]
    fn test_parse_command_search() {
        assert_eq!(
            parse_command(":search rust lang"),
            Some(Command::Search("rust lang".into()))
        );
    }

    #[test]
    fn test_parse_command_tag_strips_hash() {
        assert_eq!(parse_command(":tag #القاهرة"), Some(Command::Tag("القاهرة".into())));
    }

    #[test]
    fn test_parse_command_with_text() {
        assert_eq!(
            parse_command(":story good morning #sun"),
            Some(Command::Story("good morning #sun".into()))
        );
        assert_eq!(parse_command(":dm @omar"), Some(Command::Dm("omar".into())));
    }

    #[test]
    fn test_parse_command_aliases() {
        assert_eq!(parse_command(":q"), Some(Command::Quit));
        assert_eq!(parse_command(":h"), Some(Command::Help));
        assert_eq!(parse_command(":e"), Some(Command::Explore));
        assert_eq!(parse_command(":s"), Some(Command::Stories));
        assert_eq!(parse_command(":n"), Some(Command::Notifications));
        assert_eq!(parse_command(":m"), Some(Command::Messages));
        assert_eq!(parse_command(":home"), Some(Command::Feed));
    }

    #[test]
    fn test_parse_command_empty() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command(":"), None);
        assert_eq!(parse_command(":bogus"), None);
    }

    #[test]
    fn test_strip_at() {
        assert_eq!(strip_at("@alice"), "alice");
        assert_eq!(strip_at("bob"), "bob");
    }
}
