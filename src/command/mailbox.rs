//! Commands that operate on mailboxes.

use crate::{
    codec::encode::{self, EncodeContext},
    command::{Command, CommandType},
    error::EncodeError,
};

fn single_mailbox_line(command_type: CommandType, folder_name: &str) -> Vec<u8> {
    let mut ctx = EncodeContext::new();

    ctx.write_all(command_type.name().as_bytes());
    ctx.write_all(b" ");
    encode::mailbox(&mut ctx, folder_name);
    ctx.write_all(b"\r\n");

    ctx.into_encoded().dump()
}

macro_rules! single_mailbox_command {
    ($(#[$meta:meta])* $name:ident => $command_type:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            folder_name: Option<String>,
        }

        impl $name {
            pub fn new(folder_name: impl Into<String>) -> Self {
                Self {
                    folder_name: Some(folder_name.into()),
                }
            }

            /// The folder name, `None` after cleanup.
            pub fn folder_name(&self) -> Option<&str> {
                self.folder_name.as_deref()
            }
        }

        impl Command for $name {
            fn command_type(&self) -> CommandType {
                $command_type
            }

            fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
                let folder_name = self.folder_name.as_deref().ok_or(EncodeError::Cleared)?;

                Ok(single_mailbox_line($command_type, folder_name))
            }

            fn cleanup(&mut self) {
                self.folder_name = None;
            }
        }
    };
}

single_mailbox_command!(
    /// `subscribe = "SUBSCRIBE" SP mailbox`
    ///
    /// Adds the folder to the server's set of "active" or "subscribed" mailboxes.
    SubscribeFolder => CommandType::Subscribe
);

single_mailbox_command!(
    /// `unsubscribe = "UNSUBSCRIBE" SP mailbox`
    UnsubscribeFolder => CommandType::Unsubscribe
);

single_mailbox_command!(
    /// `create = "CREATE" SP mailbox`
    CreateFolder => CommandType::Create
);

single_mailbox_command!(
    /// `delete = "DELETE" SP mailbox`
    DeleteFolder => CommandType::Delete
);

single_mailbox_command!(
    /// `select = "SELECT" SP mailbox`
    SelectFolder => CommandType::Select
);

single_mailbox_command!(
    /// `examine = "EXAMINE" SP mailbox`
    ExamineFolder => CommandType::Examine
);

/// `rename = "RENAME" SP mailbox SP mailbox`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFolder {
    from: Option<String>,
    to: Option<String>,
}

impl RenameFolder {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }
}

impl Command for RenameFolder {
    fn command_type(&self) -> CommandType {
        CommandType::Rename
    }

    fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
        let (Some(from), Some(to)) = (self.from.as_deref(), self.to.as_deref()) else {
            return Err(EncodeError::Cleared);
        };

        let mut ctx = EncodeContext::new();
        ctx.write_all(b"RENAME ");
        encode::mailbox(&mut ctx, from);
        ctx.write_all(b" ");
        encode::mailbox(&mut ctx, to);
        ctx.write_all(b"\r\n");

        Ok(ctx.into_encoded().dump())
    }

    fn cleanup(&mut self) {
        self.from = None;
        self.to = None;
    }
}

/// `list = "LIST" SP mailbox SP list-mailbox` and `lsub = "LSUB" SP mailbox SP list-mailbox`
///
/// Both the reference and the pattern may be empty, they are sent as `""` then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFolders {
    command_type: CommandType,
    reference: Option<String>,
    pattern: Option<String>,
}

impl ListFolders {
    pub fn list(reference: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            command_type: CommandType::List,
            reference: Some(reference.into()),
            pattern: Some(pattern.into()),
        }
    }

    pub fn lsub(reference: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            command_type: CommandType::Lsub,
            ..Self::list(reference, pattern)
        }
    }
}

impl Command for ListFolders {
    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
        let (Some(reference), Some(pattern)) = (self.reference.as_deref(), self.pattern.as_deref())
        else {
            return Err(EncodeError::Cleared);
        };

        let mut ctx = EncodeContext::new();
        ctx.write_all(self.command_type.name().as_bytes());
        ctx.write_all(b" ");
        encode::list_mailbox(&mut ctx, reference);
        ctx.write_all(b" ");
        encode::list_mailbox(&mut ctx, pattern);
        ctx.write_all(b"\r\n");

        Ok(ctx.into_encoded().dump())
    }

    fn cleanup(&mut self) {
        self.reference = None;
        self.pattern = None;
    }
}

/// `status-att = "MESSAGES" / "RECENT" / "UIDNEXT" / "UIDVALIDITY" / "UNSEEN"`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusItem {
    Messages,
    Recent,
    UidNext,
    UidValidity,
    Unseen,
}

impl StatusItem {
    fn name(&self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
        }
    }
}

/// `status = "STATUS" SP mailbox SP "(" status-att *(SP status-att) ")"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    folder_name: Option<String>,
    items: Vec<StatusItem>,
}

impl Status {
    pub fn new(folder_name: impl Into<String>, items: impl Into<Vec<StatusItem>>) -> Self {
        Self {
            folder_name: Some(folder_name.into()),
            items: items.into(),
        }
    }
}

impl Command for Status {
    fn command_type(&self) -> CommandType {
        CommandType::Status
    }

    fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
        let folder_name = self.folder_name.as_deref().ok_or(EncodeError::Cleared)?;

        if self.items.is_empty() {
            return Err(EncodeError::Empty);
        }

        let items = self
            .items
            .iter()
            .map(StatusItem::name)
            .collect::<Vec<_>>()
            .join(" ");

        let mut ctx = EncodeContext::new();
        ctx.write_all(b"STATUS ");
        encode::mailbox(&mut ctx, folder_name);
        ctx.write_all(format!(" ({items})\r\n").as_bytes());

        Ok(ctx.into_encoded().dump())
    }

    fn cleanup(&mut self) {
        self.folder_name = None;
        self.items.clear();
    }
}
