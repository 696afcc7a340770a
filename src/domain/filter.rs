//! Merging per-collection requirements into a single annotated list.

use crate::domain::{
    ExclusionError, ExclusionList, FilteredRequirements, Introspection, RequirementKind,
    RequirementSet, Specifier, comments::strip_comments,
};

/// Provenance label used for lines supplied by the user.
pub const USER: &str = "user";

/// Append the provenance comment to a requirement line.
#[must_use]
pub fn annotate(line: &str, source: &str) -> String {
    format!("{line}  # from collection {source}")
}

/// The name exclusion rules are tested against, or `None` if the line is
/// opaque.
///
/// Python lines are parsed as dependency specifiers. System lines are named
/// by their first word.
#[must_use]
pub fn requirement_name(line: &str, kind: RequirementKind) -> Option<String> {
    match kind {
        RequirementKind::Python => line
            .parse::<Specifier>()
            .ok()
            .map(|spec| spec.name().to_string()),
        RequirementKind::System => line.split_whitespace().next().map(str::to_string),
    }
}

/// Merge the requirements of every collection in `set` into one list.
///
/// - collections matching `exclude_collections` contribute nothing
/// - Python lines have their comments removed; system lines starting with `#`
///   are dropped
/// - lines whose name matches `rules` (or, for system requirements, the
///   built-in [`ExclusionList::always_excluded`] list) are dropped
/// - Python lines that are not dependency specifiers are passed through
///   unchanged and without annotation
/// - user lines come last and are never excluded
///
/// Surviving lines are annotated with the collection they came from.
#[must_use]
pub fn filter_requirements(
    set: &RequirementSet,
    rules: &ExclusionList,
    kind: RequirementKind,
    exclude_collections: &ExclusionList,
) -> Vec<String> {
    let always_excluded = match kind {
        RequirementKind::Python => ExclusionList::default(),
        RequirementKind::System => ExclusionList::always_excluded(),
    };

    let mut annotated = Vec::new();

    for entry in set.collections() {
        let collection = entry.collection.to_string();
        if exclude_collections.matches(&collection) {
            tracing::debug!("Excluding all requirements from collection '{collection}'");
            continue;
        }

        for line in prepare(&entry.lines, kind) {
            let Some(name) = requirement_name(&line, kind) else {
                tracing::warn!(
                    "Passing through non-PEP508 compliant line '{line}' from collection \
                     '{collection}'"
                );
                annotated.push(line);
                continue;
            };

            if always_excluded.matches(&name) || rules.matches(&name) {
                tracing::debug!("Excluding requirement '{name}' from '{collection}'");
                continue;
            }

            annotated.push(annotate(&line, &collection));
        }
    }

    if let Some(user) = set.user() {
        for line in prepare(user, kind) {
            if requirement_name(&line, kind).is_some() {
                annotated.push(annotate(&line, USER));
            } else {
                tracing::warn!("Passing through non-PEP508 compliant user line '{line}'");
                annotated.push(line);
            }
        }
    }

    annotated
}

fn prepare(lines: &[String], kind: RequirementKind) -> Vec<String> {
    match kind {
        RequirementKind::Python => strip_comments(lines),
        RequirementKind::System => lines
            .iter()
            .filter(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .cloned()
            .collect(),
    }
}

impl Introspection {
    /// Filter both kinds of requirement, using the recorded exclusion lists.
    ///
    /// # Errors
    ///
    /// Returns an error if any recorded exclusion rule is an invalid pattern.
    pub fn filter(&self) -> Result<FilteredRequirements, ExclusionError> {
        let exclude_collections = ExclusionList::new(&self.excluded_collections)?;

        let python = filter_requirements(
            &self.python,
            &ExclusionList::new(self.python.exclude())?,
            RequirementKind::Python,
            &exclude_collections,
        );
        let system = filter_requirements(
            &self.system,
            &ExclusionList::new(self.system.exclude())?,
            RequirementKind::System,
            &exclude_collections,
        );

        Ok(FilteredRequirements { python, system })
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::CollectionId;

    fn set(collections: &[(&str, &[&str])], user: Option<&[&str]>) -> RequirementSet {
        let mut set = RequirementSet::new();
        for (id, lines) in collections {
            set.insert(
                CollectionId::try_from(*id).unwrap(),
                lines.iter().map(ToString::to_string).collect(),
            );
        }
        if let Some(user) = user {
            set.set_user(user.iter().map(ToString::to_string).collect());
        }
        set
    }

    fn rules(rules: &[&str]) -> ExclusionList {
        ExclusionList::new(rules).unwrap()
    }

    fn python(set: &RequirementSet, excluded: &[&str]) -> Vec<String> {
        filter_requirements(
            set,
            &rules(excluded),
            RequirementKind::Python,
            &ExclusionList::default(),
        )
    }

    #[test]
    fn pep508_lines_are_annotated() {
        let reqs = set(
            &[
                (
                    "a.b",
                    &[
                        "foo[ext1,ext3] == 1",
                        "bar; python_version < \"2.7\"",
                        "A",
                        "name",
                    ],
                ),
                (
                    "c.d",
                    &["FOO >= 1", "bar; python_version < \"3.6\"", "name<=1"],
                ),
                (
                    "e.f",
                    &["foo[ext2] @ git+http://github.com/foo/foo.git", "name>=3"],
                ),
                ("g.h", &["name>=3,<2"]),
                ("i.j", &["name@http://foo.com"]),
                (
                    "k.l",
                    &["name [fred,bar] @ http://foo.com ; python_version=='2.7'"],
                ),
                (
                    "m.n",
                    &["name[quux, strange];python_version<'2.7' and platform_version=='2'"],
                ),
            ],
            None,
        );

        assert_eq!(
            python(&reqs, &[]),
            [
                "foo[ext1,ext3] == 1  # from collection a.b",
                "bar; python_version < \"2.7\"  # from collection a.b",
                "A  # from collection a.b",
                "name  # from collection a.b",
                "FOO >= 1  # from collection c.d",
                "bar; python_version < \"3.6\"  # from collection c.d",
                "name<=1  # from collection c.d",
                "foo[ext2] @ git+http://github.com/foo/foo.git  # from collection e.f",
                "name>=3  # from collection e.f",
                "name>=3,<2  # from collection g.h",
                "name@http://foo.com  # from collection i.j",
                "name [fred,bar] @ http://foo.com ; python_version=='2.7'  # from collection k.l",
                "name[quux, strange];python_version<'2.7' and platform_version=='2'  # from \
                 collection m.n",
            ]
        );
    }

    #[test]
    fn comments_do_not_eat_url_fragments() {
        let reqs = set(
            &[(
                "a.b",
                &[
                    "# comment 1",
                    "git+https://git.repo/some_pkg.git#egg=SomePackage",
                    "git+https://git.repo/some_pkg.git#egg=SomeOtherPackage  # inline comment",
                    "git+https://git.repo/some_pkg.git#egg=AlsoSomePackage #inline comment that \
                     hates leading spaces",
                    "    # crazy indented comment (waka waka!)",
                    "####### something informative    ",
                    "",
                ],
            )],
            None,
        );

        assert_eq!(
            python(&reqs, &[]),
            [
                "git+https://git.repo/some_pkg.git#egg=SomePackage",
                "git+https://git.repo/some_pkg.git#egg=SomeOtherPackage",
                "git+https://git.repo/some_pkg.git#egg=AlsoSomePackage",
            ]
        );
    }

    #[test]
    fn non_pep508_lines_pass_through() {
        let reqs = set(
            &[
                (
                    "a.b",
                    &[
                        "git+https://git.repo/some_pkg.git#egg=SomePackage",
                        "svn+svn://svn.repo/some_pkg/trunk/#egg=SomePackage",
                        "https://example.com/foo/foo-0.26.0-py2.py3-none-any.whl",
                        "http://my.package.repo/SomePackage-1.0.4.zip",
                    ],
                ),
                (
                    "c.d",
                    &[
                        "-i https://pypi.org/simple",
                        "--extra-index-url http://my.package.repo/simple",
                        "--no-clean",
                        "-e svn+http://svn.example.com/svn/MyProject/trunk@2019#egg=MyProject",
                    ],
                ),
            ],
            None,
        );

        // Opaque lines survive even rules that match their leading word.
        assert_eq!(
            python(&reqs, &["git", "svn", "https", "http", "~-.*"]),
            [
                "git+https://git.repo/some_pkg.git#egg=SomePackage",
                "svn+svn://svn.repo/some_pkg/trunk/#egg=SomePackage",
                "https://example.com/foo/foo-0.26.0-py2.py3-none-any.whl",
                "http://my.package.repo/SomePackage-1.0.4.zip",
                "-i https://pypi.org/simple",
                "--extra-index-url http://my.package.repo/simple",
                "--no-clean",
                "-e svn+http://svn.example.com/svn/MyProject/trunk@2019#egg=MyProject",
            ]
        );
    }

    #[test]
    fn excluded_system_requirements() {
        let reqs = set(
            &[
                (
                    "a.b",
                    &[
                        "libxml2-dev [platform:dpkg]",
                        "dev-libs/libxml2",
                        "python3-lxml [(platform:redhat platform:base-py3)]",
                        "foo [platform:bar]",
                    ],
                ),
                (
                    "c.d",
                    &[
                        "# python is in the always-excluded list",
                        "python [platform:brew] ==3.7.3",
                        "libxml2-dev [platform:dpkg]",
                        "python3-all-dev [platform:dpkg !platform:ubuntu-precise]",
                    ],
                ),
            ],
            Some(&["foo"]),
        );

        let result = filter_requirements(
            &reqs,
            &rules(&["python3-lxml", "foo"]),
            RequirementKind::System,
            &ExclusionList::default(),
        );

        assert_eq!(
            result,
            [
                "libxml2-dev [platform:dpkg]  # from collection a.b",
                "dev-libs/libxml2  # from collection a.b",
                "libxml2-dev [platform:dpkg]  # from collection c.d",
                "python3-all-dev [platform:dpkg !platform:ubuntu-precise]  # from collection c.d",
                "foo  # from collection user",
            ]
        );
    }

    #[test]
    fn always_excluded_list_only_applies_to_system() {
        let reqs = set(&[("a.b", &["python", "pytest"])], None);

        assert_eq!(
            python(&reqs, &[]),
            ["python  # from collection a.b", "pytest  # from collection a.b"]
        );
        assert!(
            filter_requirements(
                &reqs,
                &ExclusionList::default(),
                RequirementKind::System,
                &ExclusionList::default(),
            )
            .is_empty()
        );
    }

    #[test]
    fn system_comment_lines_are_dropped() {
        let reqs = set(
            &[(
                "c.d",
                &[
                    "# python is in the always-excluded list",
                    "python [platform:brew] ==3.7.3",
                    "   # indented note",
                    "gcc",
                ],
            )],
            Some(&["# user note", "make"]),
        );

        let result = filter_requirements(
            &reqs,
            &ExclusionList::default(),
            RequirementKind::System,
            &ExclusionList::default(),
        );

        assert_eq!(
            result,
            ["gcc  # from collection c.d", "make  # from collection user"]
        );
    }

    fn excluded_python_fixture() -> RequirementSet {
        set(
            &[
                (
                    "a.b",
                    &[
                        "req1",
                        "req2==0.1.0",
                        "req4 ; python_version<='3.9'",
                        "git+https://git.repo/some_pkg.git#egg=SomePackage",
                    ],
                ),
                ("c.d", &["req1<=2.0.0", "req3"]),
                ("e.f", &["req5"]),
            ],
            Some(&["req1"]),
        )
    }

    #[test]
    fn excluded_python_requirements() {
        let reqs = set(
            &[
                (
                    "a.b",
                    &[
                        "req1",
                        "req2==0.1.0",
                        "req4 ; python_version<='3.9'",
                        "git+https://git.repo/some_pkg.git#egg=SomePackage",
                    ],
                ),
                ("c.d", &["req1<=2.0.0", "req3"]),
            ],
            Some(&["req1"]),
        );

        assert_eq!(
            python(&reqs, &["req1", "req4", "git"]),
            [
                "req2==0.1.0  # from collection a.b",
                "git+https://git.repo/some_pkg.git#egg=SomePackage",
                "req3  # from collection c.d",
                "req1  # from collection user",
            ]
        );
    }

    #[test]
    fn excluded_collections_drop_every_line() {
        let reqs = excluded_python_fixture();

        let result = filter_requirements(
            &reqs,
            &ExclusionList::default(),
            RequirementKind::Python,
            &rules(&["a.b", "e.f"]),
        );

        assert_eq!(
            result,
            [
                "req1<=2.0.0  # from collection c.d",
                "req3  # from collection c.d",
                "req1  # from collection user",
            ]
        );
    }

    #[test]
    fn user_lines_ignore_collection_rules() {
        let reqs = set(&[], Some(&["req1"]));
        let result = filter_requirements(
            &reqs,
            &rules(&["req1"]),
            RequirementKind::Python,
            &rules(&["user", "~.*"]),
        );
        assert_eq!(result, ["req1  # from collection user"]);
    }

    #[test]
    fn requirement_regex_exclusions() {
        let reqs = set(
            &[
                ("a.b", &["foo", "shimmy", "kungfoo", "aaab"]),
                ("c.d", &["foobar", "shake", "ab"]),
            ],
            None,
        );

        assert_eq!(
            python(&reqs, &["Foo", "foo.", "~foo.", "~Sh.*", "~^.+ab"]),
            [
                "kungfoo  # from collection a.b",
                "foobar  # from collection c.d",
                "ab  # from collection c.d",
            ]
        );
    }

    #[test]
    fn collection_regex_exclusions() {
        let reqs = set(
            &[
                ("a.b", &["foo"]),
                ("c.d", &["bar"]),
                ("ab.cd", &["foobar"]),
                ("e.f", &["baz"]),
                ("be.fun", &["foobaz"]),
            ],
            None,
        );

        let result = filter_requirements(
            &reqs,
            &ExclusionList::default(),
            RequirementKind::Python,
            &rules(&[r"~A\..+", "E.F", "~b.c"]),
        );

        assert_eq!(
            result,
            [
                "bar  # from collection c.d",
                "foobar  # from collection ab.cd",
                "foobaz  # from collection be.fun",
            ]
        );
    }

    #[test]
    fn decorations_do_not_affect_matching() {
        let reqs = set(
            &[(
                "a.b",
                &["Foo[bar]>=1 ; python_version>'3'", "foo @ http://x.org/f.whl", "foobar"],
            )],
            None,
        );
        assert_eq!(python(&reqs, &["foo"]), ["foobar  # from collection a.b"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let reqs = excluded_python_fixture();
        let first = python(&reqs, &[]);
        let second = python(&reqs, &[]);
        assert_eq!(first, second);
    }

    #[test_case("requests>=2", RequirementKind::Python, Some("requests"); "python specifier")]
    #[test_case("--no-clean", RequirementKind::Python, None; "python flag")]
    #[test_case("gcc [platform:rpm]", RequirementKind::System, Some("gcc"); "system with tags")]
    #[test_case("   ", RequirementKind::System, None; "system blank")]
    fn names(line: &str, kind: RequirementKind, expected: Option<&str>) {
        assert_eq!(requirement_name(line, kind).as_deref(), expected);
    }

    #[test]
    fn introspection_filter_uses_recorded_rules() {
        let mut data = Introspection {
            python: excluded_python_fixture(),
            system: set(&[("a.b", &["subversion [platform:rpm]", "python"])], None),
            excluded_collections: vec!["e.f".to_string()],
        };
        data.python.set_exclude(vec!["req1".to_string(), "~req[34]".to_string()]);
        data.system.set_exclude(vec!["SUBVERSION".to_string()]);

        let filtered = data.filter().unwrap();

        assert_eq!(
            filtered.python,
            [
                "req2==0.1.0  # from collection a.b",
                "git+https://git.repo/some_pkg.git#egg=SomePackage",
                "req1  # from collection user",
            ]
        );
        assert!(filtered.system.is_empty());
    }

    #[test]
    fn introspection_filter_reports_bad_patterns() {
        let mut data = Introspection::default();
        data.system.set_exclude(vec!["~[".to_string()]);
        assert!(data.filter().is_err());
    }
}
