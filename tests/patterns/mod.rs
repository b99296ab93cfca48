//! Graph shapes that re-enter the same node from several paths
