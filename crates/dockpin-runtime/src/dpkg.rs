/// Extract dependency package names from `dpkg -I` output.
///
/// Only the first ` Depends:` field is read. Version constraints and
/// alternatives after the first name are dropped.
pub fn parse_depends(info: &str) -> Vec<String> {
    let Some(field) = info.lines().find_map(|l| l.strip_prefix(" Depends:")) else {
        return Vec::new();
    };

    field
        .split(',')
        .map(str::trim)
        .filter_map(|dep| {
            let name = dep.split([' ', '(']).next().unwrap_or_default();
            (!name.is_empty()).then(|| name.to_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURL_INFO: &str = " new Debian package, version 2.0.
 size 315436 bytes: control archive=1442 bytes.
 Package: curl
 Version: 7.88.1-10+deb12u5
 Architecture: amd64
 Pre-Depends: dpkg (>= 1.17)
 Depends: libc6 (>= 2.34), libcurl4 (= 7.88.1-10+deb12u5), zlib1g (>= 1:1.1.4)
 Section: web
";

    #[test]
    fn parses_names_without_constraints() {
        assert_eq!(parse_depends(CURL_INFO), vec!["libc6", "libcurl4", "zlib1g"]);
    }

    #[test]
    fn alternatives_keep_first_name() {
        let info = " Depends: default-mta | mail-transport-agent, adduser\n";
        assert_eq!(parse_depends(info), vec!["default-mta", "adduser"]);
    }

    #[test]
    fn no_depends_field() {
        assert!(parse_depends(" Package: base-files\n Version: 12.4\n").is_empty());
    }

    #[test]
    fn pre_depends_is_not_depends() {
        assert!(parse_depends(" Pre-Depends: dpkg (>= 1.17)\n").is_empty());
    }

    #[test]
    fn empty_entries_dropped() {
        assert_eq!(parse_depends(" Depends: libc6,, \n"), vec!["libc6"]);
    }
}
