/// MySQL client command byte, the 5th byte of a request frame.
///
/// Only `Query` is interpreted as SQL by the carver (§4.3); every other
/// variant exists so the pairing engine can recognize "some other
/// command arrived" and desynchronize cleanly instead of misreading its
/// body as SQL.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandByte {
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
    FieldList = 0x04,
    CreateDb = 0x05,
    DropDb = 0x06,
    Refresh = 0x07,
    Shutdown = 0x08,
    Statistics = 0x09,
    ProcessInfo = 0x0a,
    Connect = 0x0b,
    ProcessKill = 0x0c,
    Debug = 0x0d,
    Ping = 0x0e,
    Time = 0x0f,
    DelayedInsert = 0x10,
    ChangeUser = 0x11,
    BinlogDump = 0x12,
    TableDump = 0x13,
    ConnectOut = 0x14,
    RegisterSlave = 0x15,
    StmtPrepare = 0x16,
    StmtExecute = 0x17,
    StmtSendLongData = 0x18,
    StmtClose = 0x19,
    StmtReset = 0x1a,
    SetOption = 0x1b,
    StmtFetch = 0x1c,
    Daemon = 0x1d,
    BinlogDumpGtid = 0x1e,
    ResetConnection = 0x1f,
}

impl CommandByte {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Quit),
            0x02 => Some(Self::InitDb),
            0x03 => Some(Self::Query),
            0x04 => Some(Self::FieldList),
            0x05 => Some(Self::CreateDb),
            0x06 => Some(Self::DropDb),
            0x07 => Some(Self::Refresh),
            0x08 => Some(Self::Shutdown),
            0x09 => Some(Self::Statistics),
            0x0a => Some(Self::ProcessInfo),
            0x0b => Some(Self::Connect),
            0x0c => Some(Self::ProcessKill),
            0x0d => Some(Self::Debug),
            0x0e => Some(Self::Ping),
            0x0f => Some(Self::Time),
            0x10 => Some(Self::DelayedInsert),
            0x11 => Some(Self::ChangeUser),
            0x12 => Some(Self::BinlogDump),
            0x13 => Some(Self::TableDump),
            0x14 => Some(Self::ConnectOut),
            0x15 => Some(Self::RegisterSlave),
            0x16 => Some(Self::StmtPrepare),
            0x17 => Some(Self::StmtExecute),
            0x18 => Some(Self::StmtSendLongData),
            0x19 => Some(Self::StmtClose),
            0x1a => Some(Self::StmtReset),
            0x1b => Some(Self::SetOption),
            0x1c => Some(Self::StmtFetch),
            0x1d => Some(Self::Daemon),
            0x1e => Some(Self::BinlogDumpGtid),
            0x1f => Some(Self::ResetConnection),
            _ => None,
        }
    }
}

/// Verbs the pairing engine treats as DML worth publishing (§4.7).
///
/// The check is a substring match against the lowercased fingerprint, not
/// a parse of the leading identifier — preserved as specified even though
/// it also matches an identifier like `selectors` (see DESIGN.md).
pub const DML_VERBS: [&str; 5] = ["select", "update", "insert", "delete", "truncate"];
