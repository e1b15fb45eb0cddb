use diesel_derive_enum::DbEnum;
use focus_core::focus::{ChargeCategory, ChargeClass, ChargeFrequency, CommitmentDiscountStatus, ServiceCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::ServiceCategory"]
pub enum DbServiceCategory {
    #[db_rename = "AI and Machine Learning"]
    AiAndMachineLearning,
    #[db_rename = "Analytics"]
    Analytics,
    #[db_rename = "Compute"]
    Compute,
    #[db_rename = "Databases"]
    Databases,
    #[db_rename = "Developer Tools"]
    DeveloperTools,
    #[db_rename = "Management and Governance"]
    ManagementAndGovernance,
    #[db_rename = "Networking"]
    Networking,
    #[db_rename = "Security, Identity, and Compliance"]
    SecurityIdentityAndCompliance,
    #[db_rename = "Storage"]
    Storage,
    #[db_rename = "Other"]
    Other,
}

impl From<ServiceCategory> for DbServiceCategory {
    fn from(value: ServiceCategory) -> Self {
        match value {
            ServiceCategory::AiAndMachineLearning => DbServiceCategory::AiAndMachineLearning,
            ServiceCategory::Analytics => DbServiceCategory::Analytics,
            ServiceCategory::Compute => DbServiceCategory::Compute,
            ServiceCategory::Databases => DbServiceCategory::Databases,
            ServiceCategory::DeveloperTools => DbServiceCategory::DeveloperTools,
            ServiceCategory::ManagementAndGovernance => DbServiceCategory::ManagementAndGovernance,
            ServiceCategory::Networking => DbServiceCategory::Networking,
            ServiceCategory::SecurityIdentityAndCompliance => DbServiceCategory::SecurityIdentityAndCompliance,
            ServiceCategory::Storage => DbServiceCategory::Storage,
            ServiceCategory::Other => DbServiceCategory::Other,
        }
    }
}

impl From<DbServiceCategory> for ServiceCategory {
    fn from(value: DbServiceCategory) -> Self {
        match value {
            DbServiceCategory::AiAndMachineLearning => ServiceCategory::AiAndMachineLearning,
            DbServiceCategory::Analytics => ServiceCategory::Analytics,
            DbServiceCategory::Compute => ServiceCategory::Compute,
            DbServiceCategory::Databases => ServiceCategory::Databases,
            DbServiceCategory::DeveloperTools => ServiceCategory::DeveloperTools,
            DbServiceCategory::ManagementAndGovernance => ServiceCategory::ManagementAndGovernance,
            DbServiceCategory::Networking => ServiceCategory::Networking,
            DbServiceCategory::SecurityIdentityAndCompliance => ServiceCategory::SecurityIdentityAndCompliance,
            DbServiceCategory::Storage => ServiceCategory::Storage,
            DbServiceCategory::Other => ServiceCategory::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::ChargeCategory"]
pub enum DbChargeCategory {
    #[db_rename = "Usage"]
    Usage,
    #[db_rename = "Purchase"]
    Purchase,
    #[db_rename = "Tax"]
    Tax,
    #[db_rename = "Credit"]
    Credit,
    #[db_rename = "Adjustment"]
    Adjustment,
}

impl From<ChargeCategory> for DbChargeCategory {
    fn from(value: ChargeCategory) -> Self {
        match value {
            ChargeCategory::Usage => DbChargeCategory::Usage,
            ChargeCategory::Purchase => DbChargeCategory::Purchase,
            ChargeCategory::Tax => DbChargeCategory::Tax,
            ChargeCategory::Credit => DbChargeCategory::Credit,
            ChargeCategory::Adjustment => DbChargeCategory::Adjustment,
        }
    }
}

impl From<DbChargeCategory> for ChargeCategory {
    fn from(value: DbChargeCategory) -> Self {
        match value {
            DbChargeCategory::Usage => ChargeCategory::Usage,
            DbChargeCategory::Purchase => ChargeCategory::Purchase,
            DbChargeCategory::Tax => ChargeCategory::Tax,
            DbChargeCategory::Credit => ChargeCategory::Credit,
            DbChargeCategory::Adjustment => ChargeCategory::Adjustment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::ChargeClass"]
pub enum DbChargeClass {
    #[db_rename = "Correction"]
    Correction,
}

impl From<ChargeClass> for DbChargeClass {
    fn from(value: ChargeClass) -> Self {
        match value {
            ChargeClass::Correction => DbChargeClass::Correction,
        }
    }
}

impl From<DbChargeClass> for ChargeClass {
    fn from(value: DbChargeClass) -> Self {
        match value {
            DbChargeClass::Correction => ChargeClass::Correction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::CommitmentDiscountStatus"]
pub enum DbCommitmentDiscountStatus {
    #[db_rename = "Used"]
    Used,
    #[db_rename = "Unused"]
    Unused,
}

impl From<CommitmentDiscountStatus> for DbCommitmentDiscountStatus {
    fn from(value: CommitmentDiscountStatus) -> Self {
        match value {
            CommitmentDiscountStatus::Used => DbCommitmentDiscountStatus::Used,
            CommitmentDiscountStatus::Unused => DbCommitmentDiscountStatus::Unused,
        }
    }
}

impl From<DbCommitmentDiscountStatus> for CommitmentDiscountStatus {
    fn from(value: DbCommitmentDiscountStatus) -> Self {
        match value {
            DbCommitmentDiscountStatus::Used => CommitmentDiscountStatus::Used,
            DbCommitmentDiscountStatus::Unused => CommitmentDiscountStatus::Unused,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::ChargeFrequency"]
pub enum DbChargeFrequency {
    #[db_rename = "One-Time"]
    OneTime,
    #[db_rename = "Recurring"]
    Recurring,
    #[db_rename = "Usage-Based"]
    UsageBased,
}

impl From<ChargeFrequency> for DbChargeFrequency {
    fn from(value: ChargeFrequency) -> Self {
        match value {
            ChargeFrequency::OneTime => DbChargeFrequency::OneTime,
            ChargeFrequency::Recurring => DbChargeFrequency::Recurring,
            ChargeFrequency::UsageBased => DbChargeFrequency::UsageBased,
        }
    }
}

impl From<DbChargeFrequency> for ChargeFrequency {
    fn from(value: DbChargeFrequency) -> Self {
        match value {
            DbChargeFrequency::OneTime => ChargeFrequency::OneTime,
            DbChargeFrequency::Recurring => ChargeFrequency::Recurring,
            DbChargeFrequency::UsageBased => ChargeFrequency::UsageBased,
        }
    }
}
