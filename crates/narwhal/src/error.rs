#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graph lists an edge that cannot be resolved: {edge_id}")]
    MissingEdge { edge_id: String },
    #[error("edge {edge_id} references a missing port: {port_id}")]
    MissingPort { edge_id: String, port_id: String },
    #[error("port {port_id} is owned by a node that is not part of the graph: {node_id}")]
    MissingNode { port_id: String, node_id: String },
    #[error("graph contains a duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
