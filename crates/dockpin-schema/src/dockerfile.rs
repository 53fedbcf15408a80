use std::collections::HashMap;

/// Find the base image of the final build stage in a Dockerfile.
///
/// The last `FROM` instruction wins. A `FROM` that names an earlier stage
/// (`FROM builder`) resolves to that stage's own base image. Returns `None`
/// when the Dockerfile has no usable `FROM`.
pub fn last_base_image(dockerfile: &str) -> Option<String> {
    let mut stages: HashMap<String, String> = HashMap::new();
    let mut last = None;

    for line in dockerfile.lines() {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            continue;
        };
        if !keyword.eq_ignore_ascii_case("FROM") {
            continue;
        }

        let Some(image) = words.find(|w| !w.starts_with("--")) else {
            continue;
        };
        let image = stages
            .get(&image.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| image.to_owned());

        let alias = match (words.next(), words.next()) {
            (Some(kw), Some(name)) if kw.eq_ignore_ascii_case("AS") => Some(name),
            _ => None,
        };
        if let Some(alias) = alias {
            stages.insert(alias.to_ascii_lowercase(), image.clone());
        }
        last = Some(image);
    }

    last
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_stage() {
        let df = "FROM debian:bookworm-slim\nRUN dockpin apt install\n";
        assert_eq!(last_base_image(df).as_deref(), Some("debian:bookworm-slim"));
    }

    #[test]
    fn last_stage_wins() {
        let df = "FROM golang:1.22 AS build\nRUN go build\n\nFROM ubuntu:22.04\nCOPY --from=build /x /x\n";
        assert_eq!(last_base_image(df).as_deref(), Some("ubuntu:22.04"));
    }

    #[test]
    fn platform_flag_skipped() {
        let df = "from --platform=linux/amd64 debian:12 as final\n";
        assert_eq!(last_base_image(df).as_deref(), Some("debian:12"));
    }

    #[test]
    fn stage_alias_is_followed() {
        let df = "FROM debian:12 AS base\nRUN true\nFROM base\n";
        assert_eq!(last_base_image(df).as_deref(), Some("debian:12"));
    }

    #[test]
    fn chained_aliases() {
        let df = "FROM debian:12 AS base\nFROM base AS deps\nFROM Deps\n";
        assert_eq!(last_base_image(df).as_deref(), Some("debian:12"));
    }

    #[test]
    fn no_from_returns_none() {
        assert_eq!(last_base_image("RUN echo hi\n# FROM debian\n"), None);
        assert_eq!(last_base_image(""), None);
        assert_eq!(last_base_image("FROM\n"), None);
    }
}
