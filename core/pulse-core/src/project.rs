//! Alternate project name derived from the editor's workspace root.

/// Last path segment of `workspace_root`, ignoring trailing separators.
/// Both `/` and `\` count as separators. Empty results yield `None`.
pub fn project_name(workspace_root: Option<&str>) -> Option<String> {
    let trimmed = workspace_root?.trim_end_matches(['/', '\\']);
    let name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_last_segment() {
        assert_eq!(
            project_name(Some("/home/user/myproject")),
            Some("myproject".to_string())
        );
    }

    #[test]
    fn bare_name_is_itself() {
        assert_eq!(project_name(Some("myproject")), Some("myproject".to_string()));
    }

    #[test]
    fn missing_root_yields_none() {
        assert_eq!(project_name(None), None);
    }

    #[test]
    fn trailing_separators_are_ignored() {
        assert_eq!(
            project_name(Some("/home/user/myproject//")),
            Some("myproject".to_string())
        );
        assert_eq!(
            project_name(Some(r"C:\Users\me\work\api\")),
            Some("api".to_string())
        );
    }

    #[test]
    fn filesystem_root_yields_none() {
        assert_eq!(project_name(Some("/")), None);
        assert_eq!(project_name(Some("")), None);
    }
}
