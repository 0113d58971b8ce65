//! Account search: which field to look at and how to compare.

use std::str::FromStr;

use lastvault_core::{Account, VaultError, VaultResult};
use regex::Regex;

/// Searchable account fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Id,
    Name,
    Url,
    Username,
}

impl Field {
    pub fn value(self, account: &Account) -> &str {
        match self {
            Field::Id => &account.id,
            Field::Name => &account.name,
            Field::Url => &account.url,
            Field::Username => &account.username,
        }
    }
}

impl FromStr for Field {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(Field::Id),
            "name" => Ok(Field::Name),
            "url" => Ok(Field::Url),
            "username" => Ok(Field::Username),
            other => Err(VaultError::Config(format!("unknown search field '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMethod {
    /// Whole value, exact case
    CaseSensitive,
    /// Whole value, any case
    CaseInsensitive,
    /// Substring, exact case
    SubstringSensitive,
    /// Substring, any case
    #[default]
    SubstringInsensitive,
    /// Unanchored regular expression
    Regex,
}

impl FromStr for SearchMethod {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "exact" | "case-sensitive" => Ok(SearchMethod::CaseSensitive),
            "exact-insensitive" | "case-insensitive" => Ok(SearchMethod::CaseInsensitive),
            "contains" | "substring" => Ok(SearchMethod::SubstringSensitive),
            "contains-insensitive" | "substring-insensitive" => {
                Ok(SearchMethod::SubstringInsensitive)
            }
            "regex" => Ok(SearchMethod::Regex),
            other => Err(VaultError::Config(format!("unknown search method '{other}'"))),
        }
    }
}

/// A compiled search: field, method and needle.
#[derive(Debug, Clone)]
pub struct Query {
    field: Field,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    ExactFolded(String),
    Substring(String),
    SubstringFolded(String),
    Pattern(Regex),
}

impl Query {
    /// Compile a query. An invalid regular expression is `InvalidEncoding`.
    pub fn new(value: &str, field: Field, method: SearchMethod) -> VaultResult<Self> {
        let matcher = match method {
            SearchMethod::CaseSensitive => Matcher::Exact(value.to_string()),
            SearchMethod::CaseInsensitive => Matcher::ExactFolded(value.to_lowercase()),
            SearchMethod::SubstringSensitive => Matcher::Substring(value.to_string()),
            SearchMethod::SubstringInsensitive => Matcher::SubstringFolded(value.to_lowercase()),
            SearchMethod::Regex => Matcher::Pattern(Regex::new(value).map_err(|e| {
                VaultError::invalid_encoding(format!("invalid search pattern: {e}"))
            })?),
        };
        Ok(Self { field, matcher })
    }

    pub fn matches(&self, account: &Account) -> bool {
        let value = self.field.value(account);
        match &self.matcher {
            Matcher::Exact(needle) => value == needle,
            Matcher::ExactFolded(needle) => value.to_lowercase() == *needle,
            Matcher::Substring(needle) => value.contains(needle.as_str()),
            Matcher::SubstringFolded(needle) => value.to_lowercase().contains(needle.as_str()),
            Matcher::Pattern(re) => re.is_match(value),
        }
    }

    /// Keep the matching accounts, in order.
    pub fn filter(&self, accounts: Vec<Account>) -> Vec<Account> {
        accounts.into_iter().filter(|a| self.matches(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_account(url: &str) -> Account {
        Account {
            url: url.into(),
            ..Default::default()
        }
    }

    fn id_account(id: &str) -> Account {
        Account {
            id: id.into(),
            ..Default::default()
        }
    }

    #[test]
    #[rustfmt::skip]
    fn test_match_methods() {
        let cases = [
            ("substring url", url_account("m.facebook.com"), "facebook.com", Field::Url, SearchMethod::SubstringSensitive, true),
            ("substring not in url", url_account("facebook.com"), "facsebook.com", Field::Url, SearchMethod::SubstringInsensitive, false),
            ("substring in url", url_account("https://stackoverflow.com/"), "StackOverflow", Field::Url, SearchMethod::SubstringInsensitive, true),
            ("regex in url", url_account("https://stackOverflow.com/"), "(s|S)tack(O|o)verflow", Field::Url, SearchMethod::Regex, true),
            ("case insens url", url_account("youtube.com"), "YouTube.com", Field::Url, SearchMethod::CaseInsensitive, true),
            ("case sens id", id_account("8675309"), "8675309", Field::Id, SearchMethod::CaseSensitive, true),
            ("case insens email", Account { username: "gimmegimme@gmail.com".into(), ..Default::default() }, "@gmail.com", Field::Username, SearchMethod::CaseInsensitive, false),
            ("regex subdomains only", url_account("m.cnn.com"), r".+\.cnn\.com", Field::Url, SearchMethod::Regex, true),
            ("regex anchored", url_account("fakenews.com"), r"^fakenews\.com", Field::Url, SearchMethod::Regex, true),
        ];

        for (name, account, needle, field, method, expected) in cases {
            let query = Query::new(needle, field, method).unwrap();
            assert_eq!(query.matches(&account), expected, "{name}");
        }
    }

    #[test]
    fn test_field_values() {
        let account = Account {
            id: "8675309".into(),
            username: "followmeontwitter".into(),
            url: "https://twitter.com/".into(),
            name: "Twitter".into(),
            ..Default::default()
        };
        assert_eq!(Field::Id.value(&account), "8675309");
        assert_eq!(Field::Username.value(&account), "followmeontwitter");
        assert_eq!(Field::Url.value(&account), "https://twitter.com/");
        assert_eq!(Field::Name.value(&account), "Twitter");
    }

    #[test]
    fn test_invalid_regex() {
        let err = Query::new("(unclosed", Field::Name, SearchMethod::Regex).unwrap_err();
        assert!(matches!(err, VaultError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_filter_keeps_order() {
        let accounts = vec![
            url_account("a.example"),
            url_account("b.other"),
            url_account("c.example"),
        ];
        let query = Query::new("example", Field::Url, SearchMethod::SubstringSensitive).unwrap();
        let urls: Vec<_> = query.filter(accounts).into_iter().map(|a| a.url).collect();
        assert_eq!(urls, vec!["a.example", "c.example"]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("URL".parse::<Field>().unwrap(), Field::Url);
        assert_eq!(
            "substring_insensitive".parse::<SearchMethod>().unwrap(),
            SearchMethod::SubstringInsensitive
        );
        assert_eq!("regex".parse::<SearchMethod>().unwrap(), SearchMethod::Regex);
        assert!("fuzzy".parse::<SearchMethod>().is_err());
        assert!("password".parse::<Field>().is_err());
    }
}
