//! Maps each collection method onto the directory query that feeds it.

use crate::models::CollectionMethod;

/// Filter and attribute selection for one method's enumeration pass.
#[derive(Debug, Clone)]
pub struct MethodQuery {
    pub filter: &'static str,
    pub attributes: &'static [&'static str],
}

const RESOLUTION_ATTRS: [&str; 4] = [
    "samaccountname",
    "distinguishedname",
    "samaccounttype",
    "objectsid",
];

const MEMBERSHIP_ATTRS: [&str; 7] = [
    "samaccountname",
    "distinguishedname",
    "samaccounttype",
    "objectsid",
    "dnshostname",
    "memberof",
    "primarygroupid",
];

const COMPUTER_ATTRS: [&str; 5] = [
    "samaccountname",
    "distinguishedname",
    "samaccounttype",
    "objectsid",
    "dnshostname",
];

const PROPERTY_ATTRS: [&str; 13] = [
    "samaccountname",
    "distinguishedname",
    "samaccounttype",
    "objectsid",
    "dnshostname",
    "useraccountcontrol",
    "pwdlastset",
    "lastlogon",
    "lastlogontimestamp",
    "sidhistory",
    "serviceprincipalname",
    "operatingsystem",
    "operatingsystemservicepack",
];

const GPO_ATTRS: [&str; 4] = ["distinguishedname", "name", "gplink", "objectsid"];

const GPO_CONTAINER_ATTRS: [&str; 3] = ["displayname", "name", "gpcfilesyspath"];

const ACL_ATTRS: [&str; 5] = [
    "samaccountname",
    "distinguishedname",
    "samaccounttype",
    "objectsid",
    "parsedacl",
];

/// The query each method runs against a domain. Trusts is absent on
/// purpose; it never enumerates directory objects.
pub fn query_for_method(method: CollectionMethod) -> MethodQuery {
    match method {
        CollectionMethod::ObjectProps => MethodQuery {
            filter: "(|(samAccountType=805306368)(samAccountType=805306369))",
            attributes: &PROPERTY_ATTRS,
        },
        CollectionMethod::Group | CollectionMethod::Default => MethodQuery {
            filter: "(|(memberof=*)(primarygroupid=*))",
            attributes: &MEMBERSHIP_ATTRS,
        },
        CollectionMethod::ComputerOnly
        | CollectionMethod::Session
        | CollectionMethod::SessionLoop
        | CollectionMethod::LocalGroup
        | CollectionMethod::LoggedOn => MethodQuery {
            filter: "(sAMAccountType=805306369)",
            attributes: &COMPUTER_ATTRS,
        },
        CollectionMethod::GpoLocalGroup => MethodQuery {
            filter: "(&(|(objectCategory=organizationalUnit)(objectClass=domain))(gplink=*))",
            attributes: &GPO_ATTRS,
        },
        CollectionMethod::Acl => MethodQuery {
            filter: "(|(samAccountType=805306368)(samAccountType=805306369)(samAccountType=268435456)(samAccountType=536870912)(objectClass=domain)(objectCategory=groupPolicyContainer))",
            attributes: &ACL_ATTRS,
        },
        CollectionMethod::Trusts => MethodQuery {
            filter: "(objectClass=domain)",
            attributes: &RESOLUTION_ATTRS,
        },
    }
}

/// Policy containers with a file-system path; the direct strategy sweeps
/// these for pushed-down admin rights.
pub fn gpo_container_query() -> MethodQuery {
    MethodQuery {
        filter: "(&(objectCategory=groupPolicyContainer)(name=*)(gpcfilesyspath=*))",
        attributes: &GPO_CONTAINER_ATTRS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_computer_methods_share_the_computer_filter() {
        for method in [
            CollectionMethod::ComputerOnly,
            CollectionMethod::Session,
            CollectionMethod::SessionLoop,
            CollectionMethod::LocalGroup,
            CollectionMethod::LoggedOn,
        ] {
            assert_eq!(
                query_for_method(method).filter,
                "(sAMAccountType=805306369)"
            );
        }
    }

    #[test]
    fn test_membership_query_requests_group_attributes() {
        let query = query_for_method(CollectionMethod::Group);
        assert!(query.attributes.contains(&"memberof"));
        assert!(query.attributes.contains(&"primarygroupid"));
    }

    #[test]
    fn test_acl_query_requests_parsed_acl() {
        let query = query_for_method(CollectionMethod::Acl);
        assert!(query.attributes.contains(&"parsedacl"));
    }
}
