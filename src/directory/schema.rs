/// Directory layout: containers, taxonomy branches and attribute names
use ldap3::{dn_escape, ldap_escape};

/// Matching rule OID for transitive (nested) group membership
pub const IN_CHAIN_RULE: &str = "1.2.840.113556.1.4.1941";

pub const ATTR_ACCOUNT_NAME: &str = "sAMAccountName";
pub const ATTR_MEMBER_OF: &str = "memberOf";
pub const ATTR_TOKEN_GROUPS: &str = "tokenGroups";
pub const ATTR_CN: &str = "cn";
pub const ATTR_DISPLAY_NAME: &str = "displayName";
pub const ATTR_MAIL: &str = "mail";

/// Where users and the two group taxonomies live in the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySchema {
    pub users_base: String,
    pub groups_base: String,
    pub computing_groups_base: String,
    /// Attribute carrying Primary / Secondary / Service
    pub account_type_attribute: String,
}

impl DirectorySchema {
    /// Standard layout below `base_dn`
    pub fn new(base_dn: &str, account_type_attribute: &str) -> Self {
        Self {
            users_base: format!("OU=Users,OU=Organic Units,{}", base_dn),
            groups_base: format!("OU=e-groups,OU=Workgroups,{}", base_dn),
            computing_groups_base: format!("OU=unix,OU=Workgroups,{}", base_dn),
            account_type_attribute: account_type_attribute.to_string(),
        }
    }

    pub fn group_dn(&self, gid: &str) -> String {
        format!("CN={},{}", dn_escape(gid), self.groups_base)
    }

    pub fn computing_group_dn(&self, gid: &str) -> String {
        format!("CN={},{}", dn_escape(gid), self.computing_groups_base)
    }

    pub fn user_dn(&self, uid: &str) -> String {
        format!("CN={},{}", dn_escape(uid), self.users_base)
    }

    /// Users that are members of `group_dn`, directly or through nesting
    pub fn transitive_members_filter(group_dn: &str) -> String {
        format!("({}:{}:={})", ATTR_MEMBER_OF, IN_CHAIN_RULE, ldap_escape(group_dn))
    }

    /// Groups whose objectSID is any of `sids`
    pub fn groups_by_sid_filter(sids: &[String]) -> String {
        let alternatives: String = sids
            .iter()
            .map(|sid| format!("(objectSID={})", ldap_escape(sid)))
            .collect();
        format!("(&(objectClass=Group)(|{}))", alternatives)
    }

    pub fn user_by_cn_filter(uid: &str) -> String {
        format!("(cn={})", ldap_escape(uid))
    }

    /// Accounts whose display name or account name contains `term`
    pub fn account_search_filter(&self, term: &str, primary_only: bool) -> String {
        let term = ldap_escape(term);
        let restriction = if primary_only {
            format!("({}=primary)", self.account_type_attribute)
        } else {
            String::new()
        };
        format!(
            "(&(objectClass=user){}(|(displayname=*{}*)(samaccountname=*{}*)))",
            restriction, term, term
        )
    }

    pub fn group_search_filter(term: &str) -> String {
        format!(
            "(&(objectClass=group)(objectClass=top)(cn=*{}*))",
            ldap_escape(term)
        )
    }

    /// First RDN of the computing branch, e.g. `OU=unix`
    fn computing_marker(&self) -> &str {
        self.computing_groups_base
            .split(',')
            .next()
            .unwrap_or_default()
    }

    /// Extract the group name from a `memberOf` link if, and only if, the
    /// link points directly into the computing branch
    pub fn computing_group_name<'a>(&self, link: &'a str) -> Option<&'a str> {
        let components: Vec<&str> = link.split(',').collect();
        let depth = self.computing_groups_base.split(',').count() + 1;
        if components.len() != depth {
            return None;
        }
        if !components[1].trim().eq_ignore_ascii_case(self.computing_marker()) {
            return None;
        }

        let (attr, value) = components[0].split_once('=')?;
        if attr.trim().eq_ignore_ascii_case("CN") && !value.is_empty() {
            Some(value)
        } else {
            None
        }
    }
}
