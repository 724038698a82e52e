//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden)]
pub enum Customers {
    Table,
    Id,
    Name,
    Email,
}

#[derive(Iden)]
pub enum ReportPeriods {
    Table,
    Id,
    CustomerId,
    WeekStart,
    WeekEnd,
    Status,
    TotalHours,
    EntryCount,
    UpdatedAt,
}

#[derive(Iden)]
pub enum TimeEntries {
    Table,
    Id,
    CustomerId,
    Employee,
    EntryDate,
    Hours,
    Description,
    Billable,
    UpdatedAt,
}

#[derive(Iden)]
pub enum AccessTokens {
    Table,
    Id,
    Token,
    Kind,
    SubjectId,
    BatchId,
    CreatedAt,
    ExpiresAt,
    FirstOpenedAt,
    LastOpenedAt,
    OpenCount,
    CustomerAction,
    CustomerActionAt,
    CustomerNotes,
}

#[derive(Iden)]
pub enum ClarificationAssignments {
    Table,
    Id,
    TimeEntryId,
    AssignedBy,
    AssigneeName,
    AssigneeEmail,
    Question,
    SuggestedDescription,
    Status,
    BatchId,
    CreatedAt,
    RespondedAt,
    ClearedAt,
    ClearedBy,
}

#[derive(Iden)]
pub enum ClarificationMessages {
    Table,
    Id,
    AssignmentId,
    SenderRole,
    SenderName,
    SenderEmail,
    Message,
    SuggestedDescription,
    CreatedAt,
}
