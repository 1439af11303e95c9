//! Distinguished-name builders for the directory schema (§6): entries are
//! classified by object-class attribute (`sdcperson`, `amonprobe`,
//! `amonprobegroup`), addressed deterministically from their UUIDs.

pub fn user_dn(user_uuid: &str) -> String {
    format!("uuid={user_uuid},ou=users,o=smartdc")
}

pub fn probe_dn(probe_uuid: &str, user_uuid: &str) -> String {
    format!("amonprobe={probe_uuid},uuid={user_uuid},ou=users,o=smartdc")
}

pub fn probe_group_dn(group_uuid: &str, user_uuid: &str) -> String {
    format!("amonprobegroup={group_uuid},uuid={user_uuid},ou=users,o=smartdc")
}

pub fn user_base_dn(user_uuid: &str) -> String {
    format!("uuid={user_uuid},ou=users,o=smartdc")
}
