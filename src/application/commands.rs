/// Command to sign in with a directory email
#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
}

/// Command to create a custom role
#[derive(Debug, Clone)]
pub struct CreateRoleCommand {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

/// Command to copy an existing role into a new custom role
#[derive(Debug, Clone)]
pub struct DuplicateRoleCommand {
    pub role_id: String,
}

/// Command to delete a custom role
#[derive(Debug, Clone)]
pub struct DeleteRoleCommand {
    pub role_id: String,
}

/// Command to grant or revoke one permission on a custom role
#[derive(Debug, Clone)]
pub struct ToggleRolePermissionCommand {
    pub role_id: String,
    pub permission_id: String,
}

/// Command to persist pending role edits
#[derive(Debug, Clone, Default)]
pub struct SaveRoleChangesCommand;

/// Command to add a user to the directory
#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    pub manager: Option<String>,
    pub custom_permissions: Vec<String>,
}

/// Command to replace the editable fields of a user
#[derive(Debug, Clone)]
pub struct UpdateUserCommand {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    pub manager: Option<String>,
    pub is_admin: bool,
}

/// Command to copy a user
#[derive(Debug, Clone)]
pub struct DuplicateUserCommand {
    pub user_id: String,
}

/// Command to remove a user
#[derive(Debug, Clone)]
pub struct DeleteUserCommand {
    pub user_id: String,
}

/// Command to flip a user between active and inactive
#[derive(Debug, Clone)]
pub struct ToggleUserStatusCommand {
    pub user_id: String,
}

/// Command to replace the permissions granted to a user individually
#[derive(Debug, Clone)]
pub struct SetCustomPermissionsCommand {
    pub user_id: String,
    pub permissions: Vec<String>,
}
