pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Family description is empty")]
    EmptyInput,

    #[error("Individual \"{name}\" is described inconsistently: {reason}")]
    AmbiguousIndividual { name: String, reason: String },

    #[error("Relationship references unknown individual: {id}")]
    DanglingReference { id: String },

    #[error("Pedigree contains a cycle involving: {}", involved.join(", "))]
    CyclicPedigree { involved: Vec<String> },

    #[error("Individual \"{child}\" is listed under conflicting parent sets")]
    ConflictingParents { child: String },

    #[error("Invalid relationship: {message}")]
    InvalidRelationship { message: String },

    #[error("Invalid pedigree config: {message}")]
    InvalidConfig { message: String },
}
